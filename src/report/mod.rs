//! The memory book: a capsule's printable digest, written as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{Capsule, Fragment, StoredAnalysis};

pub const MAX_EXCERPTS: usize = 10;
pub const EXCERPT_CHARS: usize = 280;
pub const NO_SUMMARY: &str = "No summary available yet.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryBook {
    pub capsule_id: String,
    pub title: String,
    pub recipient: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub summary: String,
    pub excerpts: Vec<String>,
    /// Emotion profile in label order; empty when nothing has been analyzed.
    pub emotion_chart: Vec<ChartPoint>,
    pub generated_at: DateTime<Utc>,
}

impl MemoryBook {
    pub fn build(capsule: &Capsule, fragments: &[Fragment], analysis: Option<&StoredAnalysis>) -> Self {
        let summary = analysis
            .map(|a| a.result.summary.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_SUMMARY.to_string());

        let excerpts = fragments
            .iter()
            .filter_map(|f| f.content_text.as_deref())
            .filter_map(excerpt)
            .take(MAX_EXCERPTS)
            .collect();

        let emotion_chart = analysis
            .map(|a| {
                a.result
                    .emotion_profile
                    .iter()
                    .map(|(emotion, value)| ChartPoint {
                        label: emotion.as_str().to_string(),
                        value,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            capsule_id: capsule.id.clone(),
            title: capsule.title.clone(),
            recipient: non_empty(&capsule.recipient),
            scheduled_for: capsule.delivery_date,
            description: non_empty(&capsule.description),
            summary,
            excerpts,
            emotion_chart,
            generated_at: Utc::now(),
        }
    }

    /// Writes `memory_book_capsule_<id>.json` into `output_dir` and returns its path.
    pub fn write_to(&self, output_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create {}", output_dir.display()))?;
        let path = output_dir.join(file_name(&self.capsule_id));
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(&path, serialized)
            .with_context(|| format!("failed to write memory book to {}", path.display()))?;
        Ok(path)
    }
}

pub fn file_name(capsule_id: &str) -> String {
    format!("memory_book_capsule_{capsule_id}.json")
}

/// Trimmed text, cut to 280 characters plus "..." when longer. Blank text has no excerpt.
pub fn excerpt(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.chars().count() <= EXCERPT_CHARS {
        return Some(text.to_string());
    }
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    Some(format!("{cut}..."))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}
