//! Local lexicon polarity, used as a secondary signal next to the remote label.
//!
//! Scoring follows the usual pattern-lexicon recipe: each sentiment word
//! contributes its polarity, an intensifier right before it scales that
//! polarity, a negation flips and dampens it (x -0.5), and the text's
//! polarity is the mean over contributing words.

use std::collections::HashMap;

use crate::models::LocalLabel;

const NEGATION_FACTOR: f64 = -0.5;

static POLARITY_WORDS: &[(&str, f64)] = &[
    // positive
    ("good", 0.7), ("great", 0.8), ("excellent", 1.0), ("amazing", 0.6), ("awesome", 1.0),
    ("fantastic", 0.4), ("wonderful", 1.0), ("love", 0.5), ("loved", 0.7), ("loving", 0.6),
    ("lovely", 0.5), ("like", 0.2), ("liked", 0.3), ("nice", 0.6), ("happy", 0.8),
    ("glad", 0.5), ("best", 1.0), ("better", 0.5), ("beautiful", 0.85), ("brilliant", 0.9),
    ("perfect", 1.0), ("fun", 0.3), ("funny", 0.25), ("cool", 0.35), ("enjoy", 0.4),
    ("enjoyed", 0.4), ("win", 0.8), ("winning", 0.5), ("won", 0.6), ("success", 0.3),
    ("successful", 0.75), ("positive", 0.23), ("fresh", 0.3), ("free", 0.4), ("easy", 0.43),
    ("fast", 0.2), ("helpful", 0.5), ("impressive", 1.0), ("incredible", 0.9), ("super", 0.33),
    ("thanks", 0.2), ("thank", 0.2), ("excited", 0.38), ("exciting", 0.3), ("interesting", 0.5),
    ("new", 0.14), ("right", 0.29), ("fine", 0.42), ("favorite", 0.5), ("favourite", 0.5),
    ("recommend", 0.4), ("proud", 0.8), ("strong", 0.43), ("safe", 0.5), ("smart", 0.21),
    ("clean", 0.37), ("kind", 0.6), ("sweet", 0.35), ("wow", 0.1), ("yay", 0.5),
    ("hope", 0.2), ("hopeful", 0.5), ("calm", 0.3), ("pleased", 0.5), ("delighted", 0.8),
    ("outstanding", 0.5), ("superb", 1.0), ("terrific", 1.0), ("rich", 0.38), ("top", 0.5),
    ("worth", 0.3), ("useful", 0.3), ("stable", 0.3), ("reliable", 0.5), ("cheap", 0.4),
    // negative
    ("bad", -0.7), ("worse", -0.4), ("worst", -1.0), ("terrible", -1.0), ("awful", -1.0),
    ("horrible", -1.0), ("poor", -0.4), ("sad", -0.5), ("angry", -0.5), ("hate", -0.8),
    ("hated", -0.9), ("hates", -0.8), ("ugly", -0.7), ("boring", -1.0), ("stupid", -0.8),
    ("dumb", -0.38), ("wrong", -0.5), ("fail", -0.5), ("failed", -0.5), ("failure", -0.32),
    ("broken", -0.4), ("slow", -0.3), ("sick", -0.71), ("tired", -0.4), ("annoying", -0.8),
    ("annoyed", -0.4), ("disappointed", -0.75), ("disappointing", -0.6), ("disgusting", -1.0),
    ("useless", -0.5), ("problem", -0.3), ("lost", -0.2), ("lose", -0.3), ("losing", -0.4),
    ("crash", -0.5), ("crashed", -0.5), ("scam", -0.8), ("fake", -0.5), ("dead", -0.2),
    ("pain", -0.5), ("painful", -0.7), ("hurt", -0.5), ("cry", -0.4), ("upset", -0.6),
    ("expensive", -0.5), ("difficult", -0.5), ("hard", -0.29), ("scary", -0.5), ("afraid", -0.6),
    ("worried", -0.5), ("unfortunately", -0.5), ("sorry", -0.5), ("mess", -0.4), ("late", -0.3),
    ("dirty", -0.6), ("rude", -0.3), ("evil", -1.0), ("crazy", -0.6), ("ridiculous", -0.33),
    ("pathetic", -1.0), ("negative", -0.3), ("weak", -0.38), ("miss", -0.2), ("delay", -0.3),
    ("delayed", -0.3), ("cancelled", -0.4), ("canceled", -0.4), ("down", -0.16), ("outage", -0.5),
];

static INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3), ("really", 1.3), ("so", 1.3), ("extremely", 1.5), ("super", 1.4),
    ("incredibly", 1.5), ("absolutely", 1.5), ("totally", 1.4), ("completely", 1.4),
    ("highly", 1.3), ("quite", 1.1), ("pretty", 1.1), ("too", 1.2), ("most", 1.3),
    ("somewhat", 0.8), ("slightly", 0.7), ("barely", 0.6), ("kinda", 0.8), ("little", 0.8),
];

static NEGATIONS: &[&str] = &[
    "not", "no", "never", "neither", "nor", "nothing", "nobody", "none", "without",
    "dont", "doesnt", "didnt", "cant", "cannot", "wont", "wouldnt", "shouldnt",
    "couldnt", "isnt", "arent", "wasnt", "werent", "havent", "hasnt", "hadnt", "aint",
    // apostrophes are stripped by the cleaner, so "don't" arrives as "don t"
    "don", "doesn", "didn", "isn", "aren", "wasn", "weren", "couldn", "wouldn", "shouldn",
    "haven", "hasn", "hadn",
];

#[derive(Debug, Clone)]
pub struct PolarityLexicon {
    words: HashMap<String, f64>,
    intensifiers: HashMap<String, f64>,
}

impl PolarityLexicon {
    pub fn new() -> Self {
        Self {
            words: POLARITY_WORDS.iter().map(|(w, p)| (w.to_string(), *p)).collect(),
            intensifiers: INTENSIFIERS.iter().map(|(w, m)| (w.to_string(), *m)).collect(),
        }
    }

    /// Extra or replacement word polarities; values are clamped to [-1, 1].
    pub fn with_overrides<'a>(mut self, overrides: impl IntoIterator<Item = (&'a String, &'a f64)>) -> Self {
        for (word, score) in overrides {
            self.words.insert(word.to_lowercase(), score.clamp(-1.0, 1.0));
        }
        self
    }

    pub fn polarity_of(&self, word: &str) -> Option<f64> {
        self.words.get(word).copied()
    }

    fn intensity_of(&self, word: &str) -> Option<f64> {
        self.intensifiers.get(word).copied()
    }

    fn is_negation(word: &str) -> bool {
        NEGATIONS.contains(&word)
    }
}

impl Default for PolarityLexicon {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolarityScorer {
    lexicon: PolarityLexicon,
}

impl PolarityScorer {
    pub fn new(lexicon: PolarityLexicon) -> Self {
        Self { lexicon }
    }

    /// Scalar polarity in [-1, 1]. Expects already-cleaned text.
    pub fn polarity(&self, cleaned: &str) -> f64 {
        let mut contributions = Vec::new();
        let mut negated = false;
        let mut intensity = 1.0;

        for raw in cleaned.split_whitespace() {
            let token = raw.to_lowercase();

            if PolarityLexicon::is_negation(&token) {
                negated = true;
                continue;
            }

            // "super" is both; it only intensifies when another sentiment word follows
            if let Some(m) = self.lexicon.intensity_of(&token) {
                if self.lexicon.polarity_of(&token).is_none() {
                    intensity *= m;
                    continue;
                }
            }

            match self.lexicon.polarity_of(&token) {
                Some(p) => {
                    let mut v = p * intensity;
                    if negated {
                        v *= NEGATION_FACTOR;
                    }
                    contributions.push(v.clamp(-1.0, 1.0));
                    negated = false;
                    intensity = 1.0;
                }
                None => {
                    // modifiers only reach the next word; the "t" of a split contraction is skipped
                    if token != "t" {
                        negated = false;
                        intensity = 1.0;
                    }
                }
            }
        }

        if contributions.is_empty() {
            return 0.0;
        }
        let mean = contributions.iter().sum::<f64>() / contributions.len() as f64;
        mean.clamp(-1.0, 1.0)
    }

    pub fn label(&self, cleaned: &str) -> LocalLabel {
        let p = self.polarity(cleaned);
        if p > 0.0 {
            LocalLabel::Positive
        } else if p < 0.0 {
            LocalLabel::Negative
        } else {
            LocalLabel::Neutral
        }
    }
}
