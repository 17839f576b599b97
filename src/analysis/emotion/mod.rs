//! Per-fragment emotion scoring.
//!
//! A fragment's weights come from two passes: keyword presence from the fixed
//! [`EmotionLexicon`] (1.0 per distinct keyword found) and a blend of the
//! general sentiment vector into joy/gratitude/love or sorrow/fear/anger.
//! The blended weights are normalized to sum to one and rounded to four places.

pub mod labels;
pub mod sentiment;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use labels::{Emotion, EmotionLexicon};
pub use sentiment::{LexiconSentiment, SentimentScorer, SentimentScores};

use super::error::EngineResult;
use super::round4;

/// Label weights keyed in declaration order. Zero-weight labels are absent.
pub type EmotionWeights = BTreeMap<Emotion, f64>;

/// Strongest label of a fragment, or `neutral` when nothing scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DominantEmotion {
    Label(Emotion),
    Neutral,
}

impl DominantEmotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            DominantEmotion::Label(emotion) => emotion.as_str(),
            DominantEmotion::Neutral => "neutral",
        }
    }

    pub fn emotion(&self) -> Option<Emotion> {
        match self {
            DominantEmotion::Label(emotion) => Some(*emotion),
            DominantEmotion::Neutral => None,
        }
    }
}

impl fmt::Display for DominantEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DominantEmotion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DominantEmotion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        if label == "neutral" {
            return Ok(DominantEmotion::Neutral);
        }
        Emotion::from_label(&label)
            .map(DominantEmotion::Label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown emotion '{label}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionScore {
    pub weights: EmotionWeights,
    pub dominant_emotion: DominantEmotion,
    pub sentiment: SentimentScores,
}

impl EmotionScore {
    /// Result for empty or whitespace-only text.
    pub fn neutral() -> Self {
        Self {
            weights: EmotionWeights::new(),
            dominant_emotion: DominantEmotion::Neutral,
            sentiment: SentimentScores::default(),
        }
    }
}

/// Scores fragments against the keyword table and an injected sentiment capability.
#[derive(Clone)]
pub struct EmotionScorer {
    lexicon: Arc<EmotionLexicon>,
    sentiment: Arc<dyn SentimentScorer>,
}

impl EmotionScorer {
    pub fn new(sentiment: Arc<dyn SentimentScorer>) -> EngineResult<Self> {
        Ok(Self {
            lexicon: Arc::new(EmotionLexicon::new()?),
            sentiment,
        })
    }

    /// Scorer backed by the bundled [`LexiconSentiment`].
    pub fn with_default_sentiment() -> EngineResult<Self> {
        Self::new(Arc::new(LexiconSentiment::new()?))
    }

    pub fn score(&self, text: &str) -> EngineResult<EmotionScore> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(EmotionScore::neutral());
        }

        let lowered = text.to_lowercase();
        let mut raw = EmotionWeights::new();
        self.lexicon.for_each_match(&lowered, |emotion, _| {
            *raw.entry(emotion).or_insert(0.0) += 1.0;
        });

        let sentiment = self.sentiment.polarity_scores(text)?;
        blend_sentiment(&mut raw, &sentiment);

        let weights = normalize(raw);
        let dominant_emotion = dominant(&weights);

        Ok(EmotionScore {
            weights,
            dominant_emotion,
            sentiment,
        })
    }
}

fn blend_sentiment(weights: &mut EmotionWeights, sentiment: &SentimentScores) {
    let mut add = |emotion: Emotion, amount: f64| {
        *weights.entry(emotion).or_insert(0.0) += amount;
    };

    if sentiment.compound > 0.0 {
        add(Emotion::Joy, 2.0 * sentiment.compound);
        add(Emotion::Gratitude, sentiment.pos);
        add(Emotion::Love, 0.5 * sentiment.pos);
    } else if sentiment.compound < 0.0 {
        add(Emotion::Sorrow, 2.0 * sentiment.compound.abs());
        add(Emotion::Fear, sentiment.neg);
        add(Emotion::Anger, 0.5 * sentiment.neg);
    }
}

fn normalize(raw: EmotionWeights) -> EmotionWeights {
    let total: f64 = raw.values().sum();
    if total <= 0.0 {
        return EmotionWeights::new();
    }
    raw.into_iter()
        .map(|(emotion, weight)| (emotion, round4(weight / total)))
        .filter(|(_, weight)| *weight > 0.0)
        .collect()
}

/// Maximum weight, earliest-declared label on ties.
pub fn dominant(weights: &EmotionWeights) -> DominantEmotion {
    let mut best: Option<(Emotion, f64)> = None;
    for emotion in Emotion::ALL {
        let Some(&weight) = weights.get(&emotion) else {
            continue;
        };
        match best {
            Some((_, best_weight)) if weight <= best_weight => {}
            _ => best = Some((emotion, weight)),
        }
    }
    best.map(|(emotion, _)| DominantEmotion::Label(emotion))
        .unwrap_or(DominantEmotion::Neutral)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::error::{AnalysisError, Stage};

    struct FixedSentiment(SentimentScores);

    impl SentimentScorer for FixedSentiment {
        fn polarity_scores(&self, _text: &str) -> EngineResult<SentimentScores> {
            Ok(self.0)
        }
    }

    struct BrokenSentiment;

    impl SentimentScorer for BrokenSentiment {
        fn polarity_scores(&self, _text: &str) -> EngineResult<SentimentScores> {
            Err(AnalysisError::computation(Stage::Sentiment, "model offline"))
        }
    }

    fn neutral_scorer() -> EmotionScorer {
        EmotionScorer::new(Arc::new(FixedSentiment(SentimentScores {
            compound: 0.0,
            pos: 0.0,
            neg: 0.0,
            neu: 1.0,
        })))
        .unwrap()
    }

    fn weight_sum(score: &EmotionScore) -> f64 {
        score.weights.values().sum()
    }

    #[test]
    fn test_empty_and_blank_text_are_neutral() {
        let scorer = EmotionScorer::with_default_sentiment().unwrap();
        for text in ["", "   ", "\n\t"] {
            let score = scorer.score(text).unwrap();
            assert_eq!(score.dominant_emotion, DominantEmotion::Neutral);
            assert!(score.weights.is_empty());
            assert_eq!(score.sentiment, SentimentScores::default());
        }
    }

    #[test]
    fn test_keywords_count_presence_not_frequency() {
        let scorer = neutral_scorer();
        let score = scorer.score("sad sad sad, so sad. I fear it").unwrap();
        assert_eq!(score.weights.get(&Emotion::Sorrow), Some(&0.5));
        assert_eq!(score.weights.get(&Emotion::Fear), Some(&0.5));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let scorer = neutral_scorer();
        let score = scorer.score("ANGRY and Furious").unwrap();
        assert_eq!(score.weights.get(&Emotion::Anger), Some(&1.0));
        assert_eq!(score.dominant_emotion, DominantEmotion::Label(Emotion::Anger));
    }

    #[test]
    fn test_ties_resolve_to_first_declared_label() {
        let scorer = neutral_scorer();
        // "grateful" is both a joy and a gratitude keyword.
        let score = scorer.score("grateful").unwrap();
        assert_eq!(score.weights.get(&Emotion::Joy), Some(&0.5));
        assert_eq!(score.weights.get(&Emotion::Gratitude), Some(&0.5));
        for _ in 0..5 {
            assert_eq!(
                scorer.score("grateful").unwrap().dominant_emotion,
                DominantEmotion::Label(Emotion::Joy)
            );
        }

        let score = scorer.score("you should thank her").unwrap();
        assert_eq!(score.dominant_emotion, DominantEmotion::Label(Emotion::Advice));
    }

    #[test]
    fn test_no_signal_gives_empty_weights() {
        let scorer = neutral_scorer();
        let score = scorer.score("the kitchen table").unwrap();
        assert!(score.weights.is_empty());
        assert_eq!(score.dominant_emotion, DominantEmotion::Neutral);
    }

    #[test]
    fn test_positive_sentiment_blend() {
        let scorer = EmotionScorer::new(Arc::new(FixedSentiment(SentimentScores {
            compound: 0.5,
            pos: 0.4,
            neg: 0.0,
            neu: 0.6,
        })))
        .unwrap();
        // joy 1.0, gratitude 0.4, love 0.2 -> total 1.6
        let score = scorer.score("a neutral sentence").unwrap();
        assert_eq!(score.weights.get(&Emotion::Joy), Some(&0.625));
        assert_eq!(score.weights.get(&Emotion::Gratitude), Some(&0.25));
        assert_eq!(score.weights.get(&Emotion::Love), Some(&0.125));
        assert_eq!(score.weights.len(), 3);
    }

    #[test]
    fn test_negative_sentiment_blend() {
        let scorer = EmotionScorer::new(Arc::new(FixedSentiment(SentimentScores {
            compound: -0.25,
            pos: 0.0,
            neg: 0.5,
            neu: 0.5,
        })))
        .unwrap();
        // sorrow 0.5, fear 0.5, anger 0.25 -> total 1.25
        let score = scorer.score("a neutral sentence").unwrap();
        assert_eq!(score.weights.get(&Emotion::Sorrow), Some(&0.4));
        assert_eq!(score.weights.get(&Emotion::Fear), Some(&0.4));
        assert_eq!(score.weights.get(&Emotion::Anger), Some(&0.2));
        assert_eq!(score.dominant_emotion, DominantEmotion::Label(Emotion::Sorrow));
    }

    #[test]
    fn test_weights_are_normalized() {
        let scorer = EmotionScorer::with_default_sentiment().unwrap();
        for text in [
            "I am so happy and grateful today",
            "I miss my mother so much, I feel alone",
            "Always remember the lesson: family values matter for the future",
            "I was angry and scared, but I love you dear son",
        ] {
            let score = scorer.score(text).unwrap();
            assert!(!score.weights.is_empty());
            assert!(score.weights.values().all(|w| *w > 0.0));
            // four-place rounding bounds the drift at 8 * 0.00005
            assert!((weight_sum(&score) - 1.0).abs() <= 4e-4, "{text}: {}", weight_sum(&score));
        }
    }

    #[test]
    fn test_sentiment_failure_propagates() {
        let scorer = EmotionScorer::new(Arc::new(BrokenSentiment)).unwrap();
        let err = scorer.score("anything at all").unwrap_err();
        assert!(err.is_computation_failure());
        // Blank input never reaches the capability.
        assert!(scorer.score("  ").is_ok());
    }

    #[test]
    fn test_dominant_emotion_serializes_as_label() {
        let json = serde_json::to_string(&DominantEmotion::Label(Emotion::Gratitude)).unwrap();
        assert_eq!(json, "\"gratitude\"");
        let neutral: DominantEmotion = serde_json::from_str("\"neutral\"").unwrap();
        assert_eq!(neutral, DominantEmotion::Neutral);
    }
}
