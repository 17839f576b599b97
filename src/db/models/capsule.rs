use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user submission that fragments, analysis and deliveries hang off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capsule {
    pub id: String,
    pub title: String,
    pub description: String,
    pub recipient: String,
    pub delivery_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub delivery_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}
