//! Capsule content analysis.
//!
//! [`AnalysisEngine`] runs the four stages over a batch of fragment texts:
//! per-fragment emotion scoring, profile aggregation, theme clustering and an
//! extractive summary of the joined text. Every stage is a pure function of
//! its input; the engine holds configuration and capabilities only.

pub mod config;
pub mod emotion;
pub mod error;
pub mod profile;
pub mod summary;
pub mod themes;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub use config::{AnalysisConfig, SummaryOrder};
pub use emotion::{DominantEmotion, Emotion, EmotionScore, EmotionScorer, EmotionWeights};
pub use emotion::{LexiconSentiment, SentimentScorer, SentimentScores};
pub use error::{AnalysisError, EngineResult, Stage};
pub use profile::{EmotionProfile, ProfileAggregator};
pub use summary::{SentenceRanker, Summarizer};
pub use themes::{ClusteringCapability, ThemeAssignment, ThemeClusterer, ThemeStrategy};

use crate::log_debug;

const ENABLE_LOGS: bool = true;

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub emotion_profile: EmotionProfile,
    pub themes: Vec<String>,
}

impl AnalysisResult {
    /// Nothing to analyze yet.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.emotion_profile.is_empty() && self.themes.is_empty()
    }
}

#[derive(Clone)]
pub struct AnalysisEngine {
    config: AnalysisConfig,
    scorer: EmotionScorer,
    aggregator: ProfileAggregator,
    clusterer: ThemeClusterer,
    summarizer: Summarizer,
}

impl AnalysisEngine {
    /// Engine backed by the bundled sentiment lexicon.
    pub fn new(config: AnalysisConfig) -> EngineResult<Self> {
        Self::with_sentiment(config, Arc::new(LexiconSentiment::new()?))
    }

    pub fn with_sentiment(
        config: AnalysisConfig,
        sentiment: Arc<dyn SentimentScorer>,
    ) -> EngineResult<Self> {
        let scorer = EmotionScorer::new(sentiment)?;
        let clusterer = ThemeClusterer::new(ClusteringCapability::detect(&config));
        let summarizer = Summarizer::lexrank(config.summary_order);
        Ok(Self::from_parts(config, scorer, clusterer, summarizer))
    }

    pub fn from_parts(
        config: AnalysisConfig,
        scorer: EmotionScorer,
        clusterer: ThemeClusterer,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            config,
            scorer,
            aggregator: ProfileAggregator,
            clusterer,
            summarizer,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn scorer(&self) -> &EmotionScorer {
        &self.scorer
    }

    /// Analyzes one capsule's fragments. Blank fragments contribute nothing;
    /// if every fragment is blank the empty result comes back.
    pub fn analyze<I, S>(&self, fragments: I) -> EngineResult<AnalysisResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.config.cluster_count == 0 {
            return Err(AnalysisError::InvalidClusterCount(0));
        }
        if self.config.max_summary_sentences == 0 {
            return Err(AnalysisError::InvalidSentenceCount);
        }

        let owned: Vec<S> = fragments.into_iter().collect();
        let texts: Vec<&str> = owned
            .iter()
            .map(AsRef::as_ref)
            .filter(|text| !text.trim().is_empty())
            .collect();
        if texts.is_empty() {
            return Ok(AnalysisResult::default());
        }

        let started = Instant::now();

        let combined = texts.join(&self.config.fragment_separator);
        let summary = self
            .summarizer
            .summarize(&combined, self.config.max_summary_sentences)?;

        let scores = texts
            .iter()
            .map(|text| self.scorer.score(text))
            .collect::<EngineResult<Vec<_>>>()?;
        let emotion_profile = self.aggregator.aggregate(scores.iter().map(|s| &s.weights));

        let assignment = self.clusterer.cluster(&texts, self.config.cluster_count)?;

        log_debug!(
            "analyzed {} fragments into {} themes in {}ms",
            texts.len(),
            assignment.themes.len(),
            started.elapsed().as_millis()
        );

        Ok(AnalysisResult {
            summary,
            emotion_profile,
            themes: assignment.themes,
        })
    }
}
