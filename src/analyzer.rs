use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{AnalysisRecord, AnalysisResult};
use crate::polarity::PolarityScorer;
use crate::preprocess::{char_count, clean_text, word_count};
use crate::remote::SentimentProvider;

/// Combines the remote service, the local scorer and text stats into one record per text.
#[derive(Clone)]
pub struct Analyzer {
    provider: Arc<dyn SentimentProvider>,
    scorer: PolarityScorer,
    language_code: String,
}

impl Analyzer {
    pub fn new(provider: Arc<dyn SentimentProvider>, scorer: PolarityScorer, language_code: impl Into<String>) -> Self {
        Self {
            provider,
            scorer,
            language_code: language_code.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Never fails: remote problems come back as `AnalysisRecord::Failed`.
    pub async fn analyze(&self, text: &str) -> AnalysisRecord {
        let cleaned = clean_text(text);
        let local = self.scorer.label(&cleaned);

        let lang = self.language_code.as_str();
        let (sentiment, phrases, entities) = tokio::join!(
            self.provider.detect_sentiment(text, lang),
            self.provider.detect_key_phrases(text, lang),
            self.provider.detect_entities(text, lang),
        );

        let failure = [
            ("sentiment", sentiment.as_ref().err()),
            ("key phrases", phrases.as_ref().err()),
            ("entities", entities.as_ref().err()),
        ]
        .into_iter()
        .find_map(|(what, e)| e.map(|e| format!("{} detection failed: {}", what, e)));

        match (sentiment, phrases, entities) {
            (Ok(sentiment), Ok(key_phrases), Ok(entities)) => {
                debug!(
                    "Text analyzed - remote={}, local={}, phrases={}, entities={}",
                    sentiment.label,
                    local,
                    key_phrases.len(),
                    entities.len()
                );
                AnalysisRecord::Analyzed(AnalysisResult {
                    text: text.to_string(),
                    remote_sentiment_label: sentiment.label,
                    remote_scores: sentiment.scores,
                    local_sentiment_label: local,
                    key_phrases,
                    entities,
                    word_count: word_count(text),
                    char_count: char_count(text),
                })
            }
            _ => {
                let error = failure.unwrap_or_else(|| "remote analysis failed".to_string());
                warn!("Analysis failed - provider={}, error={}", self.provider.name(), error);
                AnalysisRecord::Failed {
                    text: text.to_string(),
                    error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LocalLabel, SentimentLabel};
    use crate::remote::mock::MockProvider;

    fn analyzer(provider: MockProvider) -> Analyzer {
        Analyzer::new(Arc::new(provider), PolarityScorer::default(), "en")
    }

    #[tokio::test]
    async fn combines_remote_local_and_stats() {
        let a = analyzer(MockProvider::default());
        let text = "@bob I love the gorgeous #Seattle weather http://x.co/1";
        let rec = a.analyze(text).await;
        let AnalysisRecord::Analyzed(r) = rec else {
            panic!("expected success");
        };
        assert_eq!(r.text, text);
        assert_eq!(r.remote_sentiment_label, SentimentLabel::Positive);
        assert_eq!(r.local_sentiment_label, LocalLabel::Positive);
        assert_eq!(r.entities.len(), 1);
        assert_eq!(r.entities[0].text, "Seattle");
        assert!(r.key_phrases.contains(&"gorgeous".to_string()));
        assert_eq!(r.word_count, 8);
        assert_eq!(r.char_count, text.chars().count());
    }

    #[tokio::test]
    async fn remote_failure_gives_reduced_record() {
        let a = analyzer(MockProvider::failing_on(&["BOOM"]));
        let rec = a.analyze("this will BOOM").await;
        assert!(rec.is_failed());
        assert_eq!(rec.text(), "this will BOOM");
        assert!(rec.error().unwrap().contains("rejected by mock"));
    }

    #[tokio::test]
    async fn one_failing_subcall_fails_whole_record() {
        let mut p = MockProvider::failing_on(&["x"]);
        p.fail_only_entities = true;
        let rec = analyzer(p).analyze("x marks the spot").await;
        assert!(rec.error().unwrap().starts_with("entities detection failed"));
    }

    #[tokio::test]
    async fn empty_text_is_neutral_locally() {
        let rec = analyzer(MockProvider::default()).analyze("").await;
        let AnalysisRecord::Analyzed(r) = rec else {
            panic!("expected success");
        };
        assert_eq!(r.local_sentiment_label, LocalLabel::Neutral);
        assert_eq!(r.word_count, 0);
        assert_eq!(r.char_count, 0);
    }
}
