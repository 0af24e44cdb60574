use serde::{Deserialize, Serialize};
use std::fmt;

/// Label reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 4] = [
        SentimentLabel::Positive,
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
        SentimentLabel::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Negative => "NEGATIVE",
            SentimentLabel::Neutral => "NEUTRAL",
            SentimentLabel::Mixed => "MIXED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Some(SentimentLabel::Positive),
            "NEGATIVE" => Some(SentimentLabel::Negative),
            "NEUTRAL" => Some(SentimentLabel::Neutral),
            "MIXED" => Some(SentimentLabel::Mixed),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label from the local lexicon scorer. Has no MIXED counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LocalLabel {
    Positive,
    Negative,
    Neutral,
}

impl LocalLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalLabel::Positive => "POSITIVE",
            LocalLabel::Negative => "NEGATIVE",
            LocalLabel::Neutral => "NEUTRAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Some(LocalLabel::Positive),
            "NEGATIVE" => Some(LocalLabel::Negative),
            "NEUTRAL" => Some(LocalLabel::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for LocalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f64, // [0, 1]
    pub negative: f64,
    pub neutral: f64,
    pub mixed: f64,
}

impl SentimentScores {
    /// In `SentimentLabel::ALL` order.
    pub fn as_array(&self) -> [f64; 4] {
        [self.positive, self.negative, self.neutral, self.mixed]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSentiment {
    pub label: SentimentLabel,
    pub scores: SentimentScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub text: String,
    pub remote_sentiment_label: SentimentLabel,
    pub remote_scores: SentimentScores,
    pub local_sentiment_label: LocalLabel,
    pub key_phrases: Vec<String>,
    pub entities: Vec<Entity>,
    pub word_count: usize,
    pub char_count: usize,
}

/// What the aggregator hands back for one text: the full record, or the
/// reduced `{text, error}` shape when the remote side failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisRecord {
    Analyzed(AnalysisResult),
    Failed { text: String, error: String },
}

impl AnalysisRecord {
    pub fn text(&self) -> &str {
        match self {
            AnalysisRecord::Analyzed(r) => &r.text,
            AnalysisRecord::Failed { text, .. } => text,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisRecord::Analyzed(_) => None,
            AnalysisRecord::Failed { error, .. } => Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AnalysisRecord::Failed { .. })
    }
}
