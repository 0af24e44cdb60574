// Wire shapes of the Comprehend JSON 1.1 protocol (only the fields we read).
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiTextRequest<'a> {
    pub text: &'a str,
    pub language_code: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiSentimentResponse {
    pub sentiment: String, // "POSITIVE" | "NEGATIVE" | "NEUTRAL" | "MIXED"
    pub sentiment_score: ApiSentimentScore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiSentimentScore {
    #[serde(default)]
    pub positive: f64,
    #[serde(default)]
    pub negative: f64,
    #[serde(default)]
    pub neutral: f64,
    #[serde(default)]
    pub mixed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiKeyPhrasesResponse {
    #[serde(default)]
    pub key_phrases: Vec<ApiKeyPhrase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiKeyPhrase {
    pub text: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub begin_offset: Option<i64>,
    #[serde(default)]
    pub end_offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiEntitiesResponse {
    #[serde(default)]
    pub entities: Vec<ApiEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiEntity {
    pub text: String,
    #[serde(rename = "Type")]
    pub kind: String, // PERSON | LOCATION | ORGANIZATION | DATE | ...
    #[serde(default)]
    pub score: Option<f64>,
}

/// Error body, e.g. `{"__type":"TextSizeLimitExceededException","message":"..."}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "__type", default)]
    pub kind: Option<String>,
    #[serde(alias = "Message", default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn describe(&self) -> Option<String> {
        match (&self.kind, &self.message) {
            (Some(k), Some(m)) => Some(format!("{}: {}", short_type(k), m)),
            (Some(k), None) => Some(short_type(k).to_string()),
            (None, Some(m)) => Some(m.clone()),
            (None, None) => None,
        }
    }
}

// "com.amazonaws.comprehend#TextSizeLimitExceededException" -> "TextSizeLimitExceededException"
fn short_type(k: &str) -> &str {
    k.rsplit('#').next().unwrap_or(k)
}
