//! Threshold-gated extractive summaries.

pub mod lexrank;
pub mod sentences;

use std::sync::Arc;

use self::lexrank::LexRank;
use self::sentences::split_sentences;
use super::config::SummaryOrder;
use super::error::{AnalysisError, EngineResult, Stage};

/// Words allowed per requested sentence before summarization kicks in.
pub const WORDS_PER_SENTENCE: usize = 20;

/// One sentence picked by a ranker: its position in the input and its centrality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedSentence {
    pub index: usize,
    pub score: f64,
}

/// Picks at most `count` sentences, returned in the ranker's native order.
pub trait SentenceRanker: Send + Sync {
    fn rank(&self, sentences: &[&str], count: usize) -> EngineResult<Vec<RankedSentence>>;
}

#[derive(Clone)]
pub struct Summarizer {
    ranker: Arc<dyn SentenceRanker>,
    order: SummaryOrder,
}

impl Summarizer {
    pub fn new(ranker: Arc<dyn SentenceRanker>, order: SummaryOrder) -> Self {
        Self { ranker, order }
    }

    pub fn lexrank(order: SummaryOrder) -> Self {
        Self::new(Arc::new(LexRank::default()), order)
    }

    /// Returns `text` untouched when it has at most `max_sentences * 20` words,
    /// otherwise the best `max_sentences` sentences joined by single spaces.
    pub fn summarize(&self, text: &str, max_sentences: usize) -> EngineResult<String> {
        if max_sentences == 0 {
            return Err(AnalysisError::InvalidSentenceCount);
        }
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let word_count = text.split_whitespace().count();
        if word_count <= max_sentences.saturating_mul(WORDS_PER_SENTENCE) {
            return Ok(text.to_string());
        }

        let sentences = split_sentences(text);
        let mut picked = self.ranker.rank(&sentences, max_sentences)?;
        if self.order == SummaryOrder::Rank {
            picked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
        }

        let mut parts = Vec::with_capacity(picked.len());
        for ranked in picked.iter().take(max_sentences) {
            let sentence = sentences.get(ranked.index).ok_or_else(|| {
                AnalysisError::computation(
                    Stage::SentenceRanking,
                    format!("ranker returned sentence {} of {}", ranked.index, sentences.len()),
                )
            })?;
            parts.push(*sentence);
        }
        Ok(parts.join(" "))
    }
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::lexrank(SummaryOrder::Document)
    }
}
