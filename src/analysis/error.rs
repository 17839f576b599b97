use std::fmt;

/// Stage of the analysis pipeline that produced a computation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sentiment,
    Vectorization,
    Clustering,
    SentenceRanking,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Sentiment => "sentiment scoring",
            Stage::Vectorization => "vectorization",
            Stage::Clustering => "clustering",
            Stage::SentenceRanking => "sentence ranking",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the analysis engine.
///
/// Absent or empty fragments are never errors, and an unavailable clustering
/// capability is absorbed by the single-cluster strategy, so neither shows up here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("cluster count must be at least 1, got {0}")]
    InvalidClusterCount(usize),

    #[error("summary length must be at least 1 sentence")]
    InvalidSentenceCount,

    #[error("{stage} failed: {message}")]
    Computation { stage: Stage, message: String },
}

impl AnalysisError {
    pub fn computation(stage: Stage, message: impl Into<String>) -> Self {
        AnalysisError::Computation {
            stage,
            message: message.into(),
        }
    }

    /// True for failures a caller may retry, as opposed to rejected input.
    pub fn is_computation_failure(&self) -> bool {
        matches!(self, AnalysisError::Computation { .. })
    }
}

pub type EngineResult<T> = Result<T, AnalysisError>;
