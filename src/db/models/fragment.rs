use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::producers::FragmentKind;

/// One stored piece of capsule content. `content_text` is `None` when the
/// producer found no text (e.g. an image or silent audio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub id: String,
    pub capsule_id: String,
    pub kind: FragmentKind,
    pub filename: Option<String>,
    pub content_text: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFragment {
    pub capsule_id: String,
    pub kind: FragmentKind,
    pub filename: Option<String>,
    pub content_text: Option<String>,
}
