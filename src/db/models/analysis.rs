use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

/// The latest analysis of a capsule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnalysis {
    pub capsule_id: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub updated_at: DateTime<Utc>,
}
