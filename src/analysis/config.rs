use serde::{Deserialize, Serialize};

/// Order in which extracted summary sentences are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryOrder {
    /// Original document order (what the ranker hands back).
    #[default]
    Document,
    /// Descending centrality.
    Rank,
}

/// Tunables for a capsule analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Requested theme count; clamped to the number of fragments.
    pub cluster_count: usize,

    /// Sentences kept by the extractive summary. Inputs of at most
    /// `max_summary_sentences * 20` words are returned unchanged.
    pub max_summary_sentences: usize,

    /// Turns the k-means strategy off even when the `clustering` feature is built in.
    pub clustering_enabled: bool,

    pub summary_order: SummaryOrder,

    /// Joins fragments into the text handed to the summarizer.
    pub fragment_separator: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cluster_count: 4,
            max_summary_sentences: 5,
            clustering_enabled: true,
            summary_order: SummaryOrder::Document,
            fragment_separator: "\n\n".into(),
        }
    }
}
