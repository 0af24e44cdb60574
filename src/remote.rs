use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api_types::*;
use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::models::{Entity, RemoteSentiment, SentimentLabel, SentimentScores};
use crate::sigv4::{self, Credentials, SigningInput};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "Comprehend_20171127";
const SERVICE: &str = "comprehend";

/// The three capabilities of the remote NLP service. Swappable for tests.
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn detect_sentiment(&self, text: &str, language_code: &str) -> Result<RemoteSentiment, RemoteError>;

    async fn detect_key_phrases(&self, text: &str, language_code: &str) -> Result<Vec<String>, RemoteError>;

    async fn detect_entities(&self, text: &str, language_code: &str) -> Result<Vec<Entity>, RemoteError>;

    fn name(&self) -> &str;
}

/// Comprehend over its JSON 1.1 protocol, signed with SigV4 when credentials exist.
pub struct ComprehendClient {
    http: Client,
    endpoint: String,
    host: String,
    region: String,
    credentials: Option<Credentials>,
    timeout_secs: u64,
    max_retries: u32,
    retry_backoff: Duration,
}

impl ComprehendClient {
    pub fn new(cfg: &RemoteConfig) -> Result<Self> {
        let endpoint = cfg.endpoint_url();
        let url = Url::parse(&endpoint).with_context(|| format!("invalid endpoint {}", endpoint))?;
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => return Err(anyhow!("endpoint {} has no host", endpoint)),
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        let credentials = cfg.credentials();
        if credentials.is_none() {
            warn!("No AWS credentials configured - requests to {} will be unsigned", endpoint);
        }

        Ok(Self {
            http,
            endpoint,
            host,
            region: cfg.region.clone(),
            credentials,
            timeout_secs: cfg.timeout_secs,
            max_retries: cfg.max_retries,
            retry_backoff: Duration::from_millis(cfg.retry_backoff_ms),
        })
    }

    async fn call<T: DeserializeOwned>(&self, operation: &str, text: &str, language_code: &str) -> Result<T, RemoteError> {
        let body = serde_json::to_vec(&ApiTextRequest { text, language_code })
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        let target = format!("{}.{}", TARGET_PREFIX, operation);

        let mut attempt = 0u32;
        loop {
            let start = std::time::Instant::now();
            match self.call_once(&target, &body).await {
                Ok(v) => {
                    debug!(
                        "Remote call completed - op={}, attempt={}, duration={:.2}s",
                        operation,
                        attempt + 1,
                        start.elapsed().as_secs_f32()
                    );
                    return Ok(v);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let wait = self.retry_backoff * 2u32.saturating_pow(attempt);
                    warn!(
                        "Remote call failed, retrying - op={}, attempt={}/{}, wait={}ms, error={}",
                        operation,
                        attempt + 1,
                        self.max_retries + 1,
                        wait.as_millis(),
                        e
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_once<T: DeserializeOwned>(&self, target: &str, body: &[u8]) -> Result<T, RemoteError> {
        let mut req = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", target);

        if let Some(creds) = &self.credentials {
            let signed = sigv4::sign(
                creds,
                &SigningInput {
                    host: &self.host,
                    region: &self.region,
                    service: SERVICE,
                    content_type: CONTENT_TYPE,
                    target,
                    body,
                },
                chrono::Utc::now(),
            );
            req = req
                .header("X-Amz-Date", signed.amz_date)
                .header("Authorization", signed.authorization);
            if let Some(token) = signed.security_token {
                req = req.header("X-Amz-Security-Token", token);
            }
        }

        let resp = req.body(body.to_vec()).send().await.map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&raw)
                .ok()
                .and_then(|b| b.describe())
                .unwrap_or_else(|| {
                    let t = raw.trim();
                    if t.is_empty() {
                        status.canonical_reason().unwrap_or("unknown error").to_string()
                    } else {
                        t.to_string()
                    }
                });
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout(self.timeout_secs)
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl SentimentProvider for ComprehendClient {
    async fn detect_sentiment(&self, text: &str, language_code: &str) -> Result<RemoteSentiment, RemoteError> {
        let resp: ApiSentimentResponse = self.call("DetectSentiment", text, language_code).await?;
        let label = SentimentLabel::parse(&resp.sentiment)
            .ok_or_else(|| RemoteError::Decode(format!("unknown sentiment label '{}'", resp.sentiment)))?;
        let s = resp.sentiment_score;
        Ok(RemoteSentiment {
            label,
            scores: SentimentScores {
                positive: s.positive,
                negative: s.negative,
                neutral: s.neutral,
                mixed: s.mixed,
            },
        })
    }

    async fn detect_key_phrases(&self, text: &str, language_code: &str) -> Result<Vec<String>, RemoteError> {
        let resp: ApiKeyPhrasesResponse = self.call("DetectKeyPhrases", text, language_code).await?;
        Ok(resp.key_phrases.into_iter().map(|p| p.text).collect())
    }

    async fn detect_entities(&self, text: &str, language_code: &str) -> Result<Vec<Entity>, RemoteError> {
        let resp: ApiEntitiesResponse = self.call("DetectEntities", text, language_code).await?;
        Ok(resp
            .entities
            .into_iter()
            .map(|e| Entity { text: e.text, kind: e.kind })
            .collect())
    }

    fn name(&self) -> &str {
        "comprehend"
    }
}
