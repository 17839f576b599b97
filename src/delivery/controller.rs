use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::db::Database;

use super::loop_worker::delivery_loop;
use super::DeliveryLog;

/// Owns the background delivery loop.
pub struct DeliveryController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl DeliveryController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(&mut self, db: Database, log: DeliveryLog, interval: Duration) -> Result<()> {
        if self.handle.is_some() {
            bail!("delivery loop already running");
        }
        if interval.is_zero() {
            bail!("delivery poll interval must be positive");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(delivery_loop(db, log, interval, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("delivery loop task failed to join")
        } else {
            Ok(())
        }
    }
}

impl Default for DeliveryController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CapsuleInput, DeliveryChannel, DeliveryInput, DeliveryStatus};
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loop_delivers_and_stops() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("db.sqlite3")).unwrap();
        let capsule = db
            .create_capsule(CapsuleInput {
                title: "Box".into(),
                ..CapsuleInput::default()
            })
            .await
            .unwrap();
        db.schedule_delivery(DeliveryInput {
            capsule_id: capsule.id.clone(),
            scheduled_for: Utc::now(),
            channel: DeliveryChannel::Log,
            recipient_email: None,
            message: None,
        })
        .await
        .unwrap();

        let mut controller = DeliveryController::new();
        controller
            .start(db.clone(), DeliveryLog::in_data_dir(dir.path()), Duration::from_millis(20))
            .unwrap();
        assert!(controller.is_running());
        assert!(controller
            .start(db.clone(), DeliveryLog::in_data_dir(dir.path()), Duration::from_millis(20))
            .is_err());

        let mut delivered = false;
        for _ in 0..100 {
            let stored = db.list_deliveries_for_capsule(&capsule.id).await.unwrap();
            if stored[0].status == DeliveryStatus::Delivered {
                delivered = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(delivered);

        controller.stop().await.unwrap();
        assert!(!controller.is_running());
        // stopping twice is harmless
        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("db.sqlite3")).unwrap();
        let mut controller = DeliveryController::new();
        assert!(controller
            .start(db, DeliveryLog::in_data_dir(dir.path()), Duration::ZERO)
            .is_err());
        assert!(!controller.is_running());
    }
}
