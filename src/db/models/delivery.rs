//! Scheduled hand-over of a capsule to its recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Scheduled,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Scheduled => "scheduled",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Email,
    #[default]
    Log,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryChannel::Email => "email",
            DeliveryChannel::Log => "log",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: String,
    pub capsule_id: String,
    pub status: DeliveryStatus,
    pub scheduled_for: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub channel: DeliveryChannel,
    pub recipient_email: Option<String>,
    pub message: Option<String>,
    /// Opaque handle a recipient could use to fetch the capsule.
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DeliveryInput {
    pub capsule_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub channel: DeliveryChannel,
    pub recipient_email: Option<String>,
    pub message: Option<String>,
}
