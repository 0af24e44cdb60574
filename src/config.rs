use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::sigv4::Credentials;

const CONFIG_ENV: &str = "SENTITWEET_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "sentitweet.yaml";

/// Everything the pipeline, chart generator and web surface need, passed in explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub remote: RemoteConfig,
    pub batch: BatchConfig,
    pub charts: ChartConfig,
    pub server: ServerConfig,
    /// word -> polarity in [-1, 1], merged over the built-in lexicon
    pub lexicon_overrides: BTreeMap<String, f64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            remote: RemoteConfig::default(),
            batch: BatchConfig::default(),
            charts: ChartConfig::default(),
            server: ServerConfig::default(),
            lexicon_overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Overrides the regional Comprehend endpoint (local emulator, signing proxy...)
    pub endpoint: Option<String>,
    pub region: String,
    pub language_code: String,
    pub timeout_secs: u64,
    /// 0 = single attempt
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".into(),
            language_code: "en".into(),
            timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 250,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }
}

impl RemoteConfig {
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(e) => e.trim_end_matches('/').to_string(),
            None => format!("https://comprehend.{}.amazonaws.com", self.region),
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some(Credentials {
                access_key_id: id.clone(),
                secret_access_key: secret.clone(),
                session_token: self.session_token.clone().filter(|t| !t.is_empty()),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Rows analyzed at once; 1 keeps processing strictly sequential.
    pub concurrency: usize,
    pub text_column: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            text_column: "text".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    /// key-phrase and length charts are drawn wider
    pub wide_width: u32,
    pub top_phrases: usize,
    pub length_buckets: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            wide_width: 1200,
            top_phrases: 20,
            length_buckets: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".into(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// CLI path > `SENTITWEET_CONFIG` > `./sentitweet.yaml` if present > none.
fn resolve_config_path(cli: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = cli {
        return Some(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.exists().then_some(local)
}

pub fn load_config(cli_path: Option<&Path>) -> Result<AppConfig> {
    let mut cfg = match resolve_config_path(cli_path) {
        Some(path) => {
            debug!("Loading config from {}", path.display());
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            parse_config(&raw).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => {
            debug!("No config file found, using defaults");
            AppConfig::default()
        }
    };
    cfg.apply_env_overrides(|k| std::env::var(k).ok());
    Ok(cfg)
}

pub fn parse_config(yaml: &str) -> Result<AppConfig> {
    if yaml.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

impl AppConfig {
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SENTITWEET_ENDPOINT") {
            self.remote.endpoint = Some(v);
        }
        if let Some(v) = lookup("SENTITWEET_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION")) {
            self.remote.region = v;
        }
        if self.remote.access_key_id.is_none() {
            self.remote.access_key_id = lookup("AWS_ACCESS_KEY_ID");
        }
        if self.remote.secret_access_key.is_none() {
            self.remote.secret_access_key = lookup("AWS_SECRET_ACCESS_KEY");
        }
        if self.remote.session_token.is_none() {
            self.remote.session_token = lookup("AWS_SESSION_TOKEN");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_empty() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.remote.language_code, "en");
        assert_eq!(cfg.batch.text_column, "text");
        assert_eq!(cfg.batch.concurrency, 1);
        assert_eq!(cfg.charts.top_phrases, 20);
        assert_eq!(cfg.charts.length_buckets, 5);
        assert_eq!(cfg.remote.endpoint_url(), "https://comprehend.us-east-1.amazonaws.com");
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let cfg = parse_config(
            r#"
log_level: debug
remote:
  endpoint: "http://localhost:4566/"
  max_retries: 0
charts:
  width: 640
lexicon_overrides:
  bussin: 0.8
"#,
        )
        .unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.remote.endpoint_url(), "http://localhost:4566");
        assert_eq!(cfg.remote.max_retries, 0);
        assert_eq!(cfg.remote.timeout_secs, 10);
        assert_eq!(cfg.charts.width, 640);
        assert_eq!(cfg.charts.height, 600);
        assert_eq!(cfg.lexicon_overrides.get("bussin"), Some(&0.8));
    }

    #[test]
    fn env_overrides_fill_credentials() {
        let env: HashMap<&str, &str> = [
            ("AWS_DEFAULT_REGION", "eu-west-1"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("SENTITWEET_BIND", "0.0.0.0:8080"),
        ]
        .into_iter()
        .collect();
        let mut cfg = AppConfig::default();
        cfg.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.remote.region, "eu-west-1");
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        let creds = cfg.remote.credentials().unwrap();
        assert_eq!(creds.access_key_id, "AKIDEXAMPLE");
        assert!(creds.session_token.is_none());
    }

    #[test]
    fn no_credentials_without_secret() {
        let mut cfg = AppConfig::default();
        cfg.remote.access_key_id = Some("AKID".into());
        assert!(cfg.remote.credentials().is_none());
    }
}
