// src/pipeline.rs
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::analyzer::Analyzer;
use crate::charts::write_all_charts;
use crate::config::AppConfig;
use crate::error::InputError;
use crate::models::AnalysisRecord;
use crate::results::{to_rows, write_results, ResultRow};
use crate::table::{RowRange, Table};

/// One batch run: which table, which column and rows, where results go.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub viz_dir: PathBuf,
    pub text_column: String,
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub encoding: &'static str,
    pub charts_written: usize,
    pub charts_failed: usize,
    pub duration_secs: f32,
}

/// Texts of `column` within the requested row range.
pub fn select_texts(
    table: &Table,
    column: &str,
    start_row: Option<usize>,
    end_row: Option<usize>,
) -> Result<Vec<String>, InputError> {
    table.column_index(column)?;
    let range = RowRange::resolve(start_row, end_row, table.row_count())?;
    debug!("Row range resolved - start={}, end={}, rows={}", range.start, range.end, range.len());
    table.column_slice(column, range)
}

/// Analyze texts in ordered batches of `concurrency`. Output order matches input order.
pub async fn process_texts(analyzer: &Analyzer, texts: &[String], concurrency: usize) -> Vec<AnalysisRecord> {
    let total = texts.len();
    let batch_size = concurrency.max(1);
    let start = std::time::Instant::now();
    info!(
        "Analysis starting - rows={}, batch_size={}, provider={}",
        total,
        batch_size,
        analyzer.provider_name()
    );

    let mut records = Vec::with_capacity(total);
    let mut failed = 0usize;
    let mut batch_time = 0.0f32;

    for (n, chunk) in texts.chunks(batch_size).enumerate() {
        let batch_start = std::time::Instant::now();
        let results = futures::future::join_all(chunk.iter().map(|t| analyzer.analyze(t))).await;
        let elapsed = batch_start.elapsed().as_secs_f32();
        batch_time += elapsed;

        failed += results.iter().filter(|r| r.is_failed()).count();
        records.extend(results);

        let completed = records.len();
        let pct = (completed as f32 / total as f32 * 100.0) as u32;
        let avg_batch = batch_time / (n + 1) as f32;
        let remaining_batches = ((total - completed) as f32 / batch_size as f32).ceil();
        let eta = avg_batch * remaining_batches;
        info!(
            "Analysis progress: {}/{} ({}%) | Batch of {}: {:.1}s | ETA: {}m {}s",
            completed,
            total,
            pct,
            chunk.len(),
            elapsed,
            (eta / 60.0) as u32,
            (eta % 60.0) as u32
        );
    }

    info!(
        "Analysis completed - duration={:.2}s, rows={}, failed={}",
        start.elapsed().as_secs_f32(),
        total,
        failed
    );
    records
}

/// Select, analyze and flatten. Input problems come back before any row is analyzed.
pub async fn analyze_table(
    table: &Table,
    column: &str,
    start_row: Option<usize>,
    end_row: Option<usize>,
    analyzer: &Analyzer,
    concurrency: usize,
) -> Result<Vec<ResultRow>, InputError> {
    let texts = select_texts(table, column, start_row, end_row)?;
    let records = process_texts(analyzer, &texts, concurrency).await;
    Ok(to_rows(&records))
}

/// Full batch: load, analyze, write the results CSV, then render charts.
///
/// Errors wrapping [`InputError`] mean nothing was processed or written.
pub async fn run_batch(job: &BatchJob, analyzer: &Analyzer, cfg: &AppConfig) -> Result<BatchSummary> {
    let start = std::time::Instant::now();
    info!(
        "Batch started - input={}, column={}, start_row={:?}, end_row={:?}",
        job.input.display(),
        job.text_column,
        job.start_row,
        job.end_row
    );

    let input = job.input.clone();
    let table = tokio::task::spawn_blocking(move || Table::load(&input))
        .await
        .context("table load task")??;
    let rows = analyze_table(
        &table,
        &job.text_column,
        job.start_row,
        job.end_row,
        analyzer,
        cfg.batch.concurrency,
    )
    .await?;

    let rows_processed = rows.len();
    let rows_failed = rows.iter().filter(|r| r.is_error()).count();
    if rows_failed > 0 {
        warn!("Batch rows failed - failed={}, total={}", rows_failed, rows_processed);
    }

    // file writes and chart rendering block; keep them off the runtime threads
    let (output, viz_dir, chart_cfg) = (job.output.clone(), job.viz_dir.clone(), cfg.charts.clone());
    let charts = tokio::task::spawn_blocking(move || -> Result<_> {
        write_results(&output, &rows)?;
        write_all_charts(&viz_dir, &rows, &chart_cfg)
    })
    .await
    .context("output task")??;

    let summary = BatchSummary {
        rows_processed,
        rows_failed,
        encoding: table.encoding,
        charts_written: charts.written.len(),
        charts_failed: charts.failed.len(),
        duration_secs: start.elapsed().as_secs_f32(),
    };
    info!(
        "Batch completed - duration={:.2}s, rows={}, failed={}, encoding={}, charts={}/{}",
        summary.duration_secs,
        summary.rows_processed,
        summary.rows_failed,
        summary.encoding,
        summary.charts_written,
        summary.charts_written + summary.charts_failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polarity::PolarityScorer;
    use crate::remote::mock::MockProvider;
    use crate::results::read_results;
    use std::sync::Arc;

    fn analyzer(p: MockProvider) -> Analyzer {
        Analyzer::new(Arc::new(p), PolarityScorer::default(), "en")
    }

    fn job(dir: &std::path::Path, csv: &[u8]) -> BatchJob {
        let input = dir.join("in.csv");
        std::fs::write(&input, csv).unwrap();
        BatchJob {
            input,
            output: dir.join("out/results.csv"),
            viz_dir: dir.join("viz"),
            text_column: "text".into(),
            start_row: None,
            end_row: None,
        }
    }

    #[tokio::test]
    async fn one_bad_row_does_not_block_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let csv = "id,text\n1,I love mornings\n2,traffic again\n3,this will BOOM\n4,great coffee\n5,awful weather\n";
        let j = job(dir.path(), csv.as_bytes());

        let summary = run_batch(&j, &analyzer(MockProvider::failing_on(&["BOOM"])), &AppConfig::default())
            .await
            .unwrap();
        assert_eq!(summary.rows_processed, 5);
        assert_eq!(summary.rows_failed, 1);
        assert_eq!(summary.encoding, "utf-8");
        assert_eq!(summary.charts_written, 5);
        assert_eq!(summary.charts_failed, 0);

        let rows = read_results(&j.output).unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows[2].is_error());
        assert_eq!(rows[2].text, "this will BOOM");
        assert!(rows.iter().enumerate().all(|(i, r)| i == 2 || !r.is_error()));
        assert_eq!(rows[0].remote_sentiment.as_deref(), Some("POSITIVE"));
    }

    #[tokio::test]
    async fn rows_without_key_phrases_still_get_four_charts() {
        let dir = tempfile::tempdir().unwrap();
        let j = job(dir.path(), b"text\nI love it\nbad day\nso great\nmeh ok\n");

        let summary = run_batch(&j, &analyzer(MockProvider::default()), &AppConfig::default())
            .await
            .unwrap();
        assert_eq!(summary.charts_written, 4);
        assert_eq!(summary.charts_failed, 1);
        for name in [
            "sentiment_distribution.png",
            "sentiment_comparison.png",
            "sentiment_scores.png",
            "sentiment_by_length.png",
        ] {
            assert!(j.viz_dir.join(name).exists(), "{name} missing");
        }
        assert!(!j.viz_dir.join("top_key_phrases.png").exists());
    }

    #[tokio::test]
    async fn slices_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = String::from("text,n\n");
        for i in 0..10 {
            csv.push_str(&format!("tweet {i},{i}\n"));
        }
        let mut j = job(dir.path(), csv.as_bytes());
        j.start_row = Some(2);
        j.end_row = Some(5);

        run_batch(&j, &analyzer(MockProvider::default()), &AppConfig::default()).await.unwrap();
        let texts: Vec<_> = read_results(&j.output).unwrap().into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["tweet 2", "tweet 3", "tweet 4"]);
    }

    #[tokio::test]
    async fn concurrent_batches_keep_input_order() {
        let texts: Vec<String> = (0..7).map(|i| format!("row {i}")).collect();
        let records = process_texts(&analyzer(MockProvider::default()), &texts, 3).await;
        let back: Vec<_> = records.iter().map(|r| r.text().to_string()).collect();
        assert_eq!(back, texts);
    }

    #[tokio::test]
    async fn latin1_input_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let j = job(dir.path(), b"text\ncaf\xE9 is great\n");
        let summary = run_batch(&j, &analyzer(MockProvider::default()), &AppConfig::default())
            .await
            .unwrap();
        assert_eq!(summary.encoding, "iso-8859-1");
        let rows = read_results(&j.output).unwrap();
        assert_eq!(rows[0].text, "café is great");
    }

    #[tokio::test]
    async fn missing_column_aborts_before_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut j = job(dir.path(), b"tweet\nhello\n");
        j.text_column = "text".into();

        let err = run_batch(&j, &analyzer(MockProvider::default()), &AppConfig::default())
            .await
            .unwrap_err();
        let input = err.downcast_ref::<InputError>().expect("input error");
        assert!(matches!(input, InputError::MissingColumn { .. }));
        assert!(input.to_string().contains("available columns: tweet"));
        assert!(!j.output.exists());
        assert!(!j.viz_dir.exists());
    }

    #[tokio::test]
    async fn bad_range_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut j = job(dir.path(), b"text\na\nb\nc\n");
        j.start_row = Some(3);
        j.end_row = Some(1);
        let err = run_batch(&j, &analyzer(MockProvider::default()), &AppConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<InputError>(), Some(InputError::RowRange { .. })));
    }
}
