// src/web.rs
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::analyzer::Analyzer;
use crate::charts::render_inline;
use crate::config::AppConfig;
use crate::models::AnalysisRecord;
use crate::pipeline::analyze_table;
use crate::render::{render_index, render_results};
use crate::table::Table;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Analyzer,
    pub config: Arc<AppConfig>,
}

pub fn router(state: AppState) -> Router {
    let limit = state.config.server.max_upload_bytes;
    Router::new()
        .route("/", get(index).post(upload))
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(limit))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {}", bind))?;
    info!("Server listening - addr={}, provider={}", listener.local_addr()?, state.analyzer.provider_name());
    axum::serve(listener, router(state)).await.context("server error")
}

async fn index(State(st): State<AppState>) -> Html<String> {
    Html(render_index(&st.config.batch.text_column))
}

async fn health(State(st): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "provider": st.analyzer.provider_name() }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(default, alias = "tweet")]
    text: Option<String>,
}

fn json_error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "error": msg.into() }))).into_response()
}

async fn analyze(State(st): State<AppState>, payload: Result<Json<AnalyzeRequest>, JsonRejection>) -> Response {
    let text = match payload {
        Ok(Json(AnalyzeRequest { text: Some(t) })) if !t.trim().is_empty() => t,
        Ok(_) => return json_error(StatusCode::BAD_REQUEST, "missing or empty 'text'"),
        Err(rej) => return json_error(StatusCode::BAD_REQUEST, rej.body_text()),
    };

    match st.analyzer.analyze(&text).await {
        AnalysisRecord::Analyzed(result) => Json(result).into_response(),
        AnalysisRecord::Failed { error, .. } => json_error(StatusCode::INTERNAL_SERVER_ERROR, error),
    }
}

#[derive(Debug, Default)]
struct UploadForm {
    file_name: String,
    file: Option<Vec<u8>>,
    text_column: Option<String>,
    start_row: Option<usize>,
    end_row: Option<usize>,
}

fn bad_request(msg: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.into())
}

fn parse_row(name: &str, value: &str) -> Result<Option<usize>, (StatusCode, String)> {
    let v = value.trim();
    if v.is_empty() {
        return Ok(None);
    }
    v.parse()
        .map(Some)
        .map_err(|_| bad_request(format!("{} must be a non-negative integer, got '{}'", name, v)))
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, (StatusCode, String)> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().unwrap_or("upload.csv").to_string();
                let bytes = field.bytes().await.map_err(|e| bad_request(format!("invalid upload: {}", e)))?;
                form.file = Some(bytes.to_vec());
            }
            "text_column" | "start_row" | "end_row" => {
                let value = field.text().await.map_err(|e| bad_request(format!("invalid field {}: {}", name, e)))?;
                match name.as_str() {
                    "text_column" if !value.trim().is_empty() => form.text_column = Some(value.trim().to_string()),
                    "start_row" => form.start_row = parse_row("start_row", &value)?,
                    "end_row" => form.end_row = parse_row("end_row", &value)?,
                    _ => {}
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn upload(State(st): State<AppState>, multipart: Multipart) -> Result<Html<String>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let form = read_form(multipart).await?;
    let bytes = match form.file {
        Some(b) if !b.is_empty() => b,
        _ => return Err(bad_request("no file uploaded")),
    };
    let column = form.text_column.unwrap_or_else(|| st.config.batch.text_column.clone());

    let table = Table::from_bytes(&bytes).map_err(|e| {
        warn!("Upload rejected - file={}, error={}", form.file_name, e);
        bad_request(e.to_string())
    })?;
    let rows = analyze_table(
        &table,
        &column,
        form.start_row,
        form.end_row,
        &st.analyzer,
        st.config.batch.concurrency,
    )
    .await
    .map_err(|e| {
        warn!("Upload rejected - file={}, error={}", form.file_name, e);
        bad_request(e.to_string())
    })?;

    let chart_cfg = st.config.charts.clone();
    let (rows, charts, chart_errors) = tokio::task::spawn_blocking(move || {
        let (charts, failed) = render_inline(&rows, &chart_cfg);
        let errors: Vec<String> = failed
            .into_iter()
            .map(|(kind, e)| format!("{}: {}", kind.file_name(), e))
            .collect();
        (rows, charts, errors)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("chart rendering failed: {}", e)))?;

    info!(
        "Upload completed - duration={:.2}s, file={}, encoding={}, rows={}, charts={}",
        start.elapsed().as_secs_f32(),
        form.file_name,
        table.encoding,
        rows.len(),
        charts.len()
    );
    Ok(Html(render_results(&form.file_name, &rows, &charts, &chart_errors)))
}
