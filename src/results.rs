use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::models::{AnalysisRecord, Entity, LocalLabel, SentimentLabel, SentimentScores};

/// One flattened output row. Error rows keep `text` and `error` and leave the rest empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultRow {
    pub text: String,
    pub remote_sentiment: Option<String>,
    pub remote_positive: Option<f64>,
    pub remote_negative: Option<f64>,
    pub remote_neutral: Option<f64>,
    pub remote_mixed: Option<f64>,
    pub local_sentiment: Option<String>,
    /// JSON array of strings
    pub key_phrases: Option<String>,
    /// JSON array of {"text","type"}
    pub entities: Option<String>,
    pub word_count: Option<usize>,
    pub char_count: Option<usize>,
    pub error: Option<String>,
}

impl From<&AnalysisRecord> for ResultRow {
    fn from(rec: &AnalysisRecord) -> Self {
        match rec {
            AnalysisRecord::Analyzed(r) => ResultRow {
                text: r.text.clone(),
                remote_sentiment: Some(r.remote_sentiment_label.to_string()),
                remote_positive: Some(r.remote_scores.positive),
                remote_negative: Some(r.remote_scores.negative),
                remote_neutral: Some(r.remote_scores.neutral),
                remote_mixed: Some(r.remote_scores.mixed),
                local_sentiment: Some(r.local_sentiment_label.to_string()),
                key_phrases: serde_json::to_string(&r.key_phrases).ok(),
                entities: serde_json::to_string(&r.entities).ok(),
                word_count: Some(r.word_count),
                char_count: Some(r.char_count),
                error: None,
            },
            AnalysisRecord::Failed { text, error } => ResultRow {
                text: text.clone(),
                error: Some(error.clone()),
                ..ResultRow::default()
            },
        }
    }
}

impl ResultRow {
    pub fn is_error(&self) -> bool {
        self.error.as_deref().map_or(false, |e| !e.is_empty())
    }

    pub fn remote_label(&self) -> Option<SentimentLabel> {
        self.remote_sentiment.as_deref().and_then(SentimentLabel::parse)
    }

    pub fn local_label(&self) -> Option<LocalLabel> {
        self.local_sentiment.as_deref().and_then(LocalLabel::parse)
    }

    pub fn scores(&self) -> Option<SentimentScores> {
        Some(SentimentScores {
            positive: self.remote_positive?,
            negative: self.remote_negative?,
            neutral: self.remote_neutral?,
            mixed: self.remote_mixed?,
        })
    }

    /// Empty when the column is blank or not a JSON string array.
    pub fn key_phrase_list(&self) -> Vec<String> {
        self.key_phrases
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }

    pub fn entity_list(&self) -> Vec<Entity> {
        self.entities
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }

    /// Length used for bucketing: stored char count, else counted from text.
    pub fn text_length(&self) -> usize {
        self.char_count.unwrap_or_else(|| self.text.chars().count())
    }
}

pub fn to_rows(records: &[AnalysisRecord]) -> Vec<ResultRow> {
    records.iter().map(ResultRow::from).collect()
}

pub fn to_csv_bytes(rows: &[ResultRow]) -> Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    for r in rows {
        w.serialize(r)?;
    }
    // header is only emitted with the first record
    if rows.is_empty() {
        w.write_record(HEADER)?;
    }
    w.into_inner().context("flushing csv buffer")
}

const HEADER: [&str; 12] = [
    "text",
    "remote_sentiment",
    "remote_positive",
    "remote_negative",
    "remote_neutral",
    "remote_mixed",
    "local_sentiment",
    "key_phrases",
    "entities",
    "word_count",
    "char_count",
    "error",
];

pub fn write_results(path: &Path, rows: &[ResultRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    let bytes = to_csv_bytes(rows)?;
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
    info!("Results written - path={}, rows={}", path.display(), rows.len());
    Ok(())
}

pub fn read_results(path: &Path) -> Result<Vec<ResultRow>> {
    let mut r = csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let mut rows = Vec::new();
    for row in r.deserialize() {
        rows.push(row.with_context(|| format!("parse {}", path.display()))?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisResult;

    fn ok_record(text: &str) -> AnalysisRecord {
        AnalysisRecord::Analyzed(AnalysisResult {
            text: text.into(),
            remote_sentiment_label: SentimentLabel::Negative,
            remote_scores: SentimentScores { positive: 0.1, negative: 0.7, neutral: 0.15, mixed: 0.05 },
            local_sentiment_label: LocalLabel::Neutral,
            key_phrases: vec!["late train".into(), "again".into()],
            entities: vec![Entity { text: "Amtrak".into(), kind: "ORGANIZATION".into() }],
            word_count: text.split_whitespace().count(),
            char_count: text.chars().count(),
        })
    }

    #[test]
    fn round_trip_keeps_rows_and_text() {
        let records = vec![
            ok_record("late train, again"),
            AnalysisRecord::Failed { text: "multi\nline \"quoted\"".into(), error: "boom".into() },
            ok_record("ñandú"),
        ];
        let rows = to_rows(&records);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        write_results(&path, &rows).unwrap();
        let back = read_results(&path).unwrap();

        assert_eq!(back.len(), 3);
        let texts: Vec<_> = back.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["late train, again", "multi\nline \"quoted\"", "ñandú"]);

        assert!(back[1].is_error());
        assert_eq!(back[1].remote_sentiment, None);
        assert_eq!(back[0].remote_label(), Some(SentimentLabel::Negative));
        assert_eq!(back[0].key_phrase_list(), vec!["late train", "again"]);
        assert_eq!(back[0].entity_list()[0].kind, "ORGANIZATION");
        assert_eq!(back[0].scores().unwrap().negative, 0.7);
    }

    #[test]
    fn header_written_for_empty_output() {
        let bytes = to_csv_bytes(&[]).unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert_eq!(s.trim_end(), HEADER.join(","));
    }

    #[test]
    fn error_row_flattening() {
        let row = ResultRow::from(&AnalysisRecord::Failed { text: "t".into(), error: "e".into() });
        assert!(row.is_error());
        assert!(row.scores().is_none());
        assert!(row.key_phrase_list().is_empty());
        assert_eq!(row.text_length(), 1);
    }
}
