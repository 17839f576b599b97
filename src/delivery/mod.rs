//! Scheduled capsule delivery.
//!
//! Delivery is recorded in an append-only log; a background loop drains due
//! deliveries on a fixed interval.

pub mod controller;
mod loop_worker;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::db::models::{Delivery, DeliveryStatus};
use crate::db::Database;
use crate::{log_error, log_info};

pub use controller::DeliveryController;

const ENABLE_LOGS: bool = true;

/// `[timestamp] message` lines in `deliveries.log`.
#[derive(Debug, Clone)]
pub struct DeliveryLog {
    path: PathBuf,
}

impl DeliveryLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<data_dir>/deliveries/deliveries.log`
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("deliveries").join("deliveries.log"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, at: DateTime<Utc>, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        writeln!(file, "[{}] {}", at.to_rfc3339_opts(SecondsFormat::Secs, true), message)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// Ids handled by one `deliver_due` pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

/// Delivers everything due at `now`. A failed delivery is marked `failed` and
/// does not stop the rest of the batch.
pub async fn deliver_due(db: &Database, log: &DeliveryLog, now: DateTime<Utc>) -> Result<DeliveryReport> {
    let due = db.get_due_deliveries(now).await?;
    let mut report = DeliveryReport::default();

    for delivery in due {
        match deliver_one(db, log, &delivery, now).await {
            Ok(()) => {
                db.update_delivery_status(&delivery.id, DeliveryStatus::Delivered, now)
                    .await?;
                report.delivered.push(delivery.id);
            }
            Err(err) => {
                log_error!("delivery {} failed: {err:#}", delivery.id);
                if let Err(log_err) = log.append(now, &format!("Failed delivery id={}: {err:#}", delivery.id)) {
                    log_error!("could not record failed delivery {}: {log_err:#}", delivery.id);
                }
                db.update_delivery_status(&delivery.id, DeliveryStatus::Failed, now)
                    .await?;
                report.failed.push(delivery.id);
            }
        }
    }

    if !report.delivered.is_empty() || !report.failed.is_empty() {
        log_info!(
            "delivery pass: {} delivered, {} failed",
            report.delivered.len(),
            report.failed.len()
        );
    }
    Ok(report)
}

async fn deliver_one(db: &Database, log: &DeliveryLog, delivery: &Delivery, now: DateTime<Utc>) -> Result<()> {
    let title = db
        .get_capsule(&delivery.capsule_id)
        .await?
        .map(|capsule| capsule.title)
        .unwrap_or_else(|| "(unknown)".to_string());

    log.append(
        now,
        &format!(
            "Deliver capsule {} ({}) via {} to {}: {}",
            delivery.capsule_id,
            title,
            delivery.channel.as_str(),
            delivery.recipient_email.as_deref().unwrap_or("N/A"),
            delivery.message.as_deref().unwrap_or(""),
        ),
    )
}
