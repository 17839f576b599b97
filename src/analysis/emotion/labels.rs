use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::error::{AnalysisError, EngineResult, Stage};

/// The closed set of emotion labels.
///
/// Variant order is the tie-break order for dominant-emotion selection and
/// also the iteration order of every weight map keyed by `Emotion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Sorrow,
    Advice,
    Legacy,
    Gratitude,
    Anger,
    Fear,
    Love,
}

impl Emotion {
    pub const ALL: [Emotion; 8] = [
        Emotion::Joy,
        Emotion::Sorrow,
        Emotion::Advice,
        Emotion::Legacy,
        Emotion::Gratitude,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Love,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Sorrow => "sorrow",
            Emotion::Advice => "advice",
            Emotion::Legacy => "legacy",
            Emotion::Gratitude => "gratitude",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Love => "love",
        }
    }

    pub fn from_label(label: &str) -> Option<Emotion> {
        Emotion::ALL.into_iter().find(|emotion| emotion.as_str() == label)
    }

    /// Keyword phrases that mark this emotion. A phrase may belong to more than one label.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Emotion::Joy => &["happy", "joy", "smile", "grateful", "blessed", "proud", "celebrate"],
            Emotion::Sorrow => &["sad", "loss", "miss", "cry", "grief", "sorry", "alone"],
            Emotion::Advice => &["remember", "always", "should", "lesson", "advice", "teach"],
            Emotion::Legacy => &["legacy", "remember me", "after i'm gone", "future", "values", "family"],
            Emotion::Gratitude => &["thank", "thanks", "grateful", "appreciate"],
            Emotion::Anger => &["angry", "mad", "furious", "upset", "annoyed"],
            Emotion::Fear => &["fear", "worry", "anxious", "afraid", "scared"],
            Emotion::Love => &["love", "dear", "beloved", "daughter", "son", "wife", "husband"],
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct KeywordPattern {
    emotion: Emotion,
    phrase: &'static str,
    pattern: Regex,
}

/// Keyword table compiled once into whole-word patterns.
pub struct EmotionLexicon {
    patterns: Vec<KeywordPattern>,
}

impl EmotionLexicon {
    pub fn new() -> EngineResult<Self> {
        let mut patterns = Vec::new();
        for emotion in Emotion::ALL {
            for &phrase in emotion.keywords() {
                let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(phrase))).map_err(|err| {
                    AnalysisError::computation(
                        Stage::Sentiment,
                        format!("invalid keyword pattern '{phrase}': {err}"),
                    )
                })?;
                patterns.push(KeywordPattern {
                    emotion,
                    phrase,
                    pattern,
                });
            }
        }
        Ok(Self { patterns })
    }

    /// Calls `hit` once per keyword present in `lowered`, however often it occurs.
    pub fn for_each_match(&self, lowered: &str, mut hit: impl FnMut(Emotion, &'static str)) {
        for entry in &self.patterns {
            if entry.pattern.is_match(lowered) {
                hit(entry.emotion, entry.phrase);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
