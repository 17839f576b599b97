use chrono::Utc;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::db::Database;
use crate::{log_error, log_info, log_warn};

use super::{deliver_due, DeliveryLog};

const ENABLE_LOGS: bool = true;

const PASS_TIMEOUT_SECS: u64 = 30;

pub async fn delivery_loop(
    db: Database,
    log: DeliveryLog,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log_info!("delivery loop started (every {}s)", interval.as_secs_f64());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let pass = deliver_due(&db, &log, Utc::now());
                match tokio::time::timeout(Duration::from_secs(PASS_TIMEOUT_SECS), pass).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => log_error!("delivery pass failed: {err:?}"),
                    Err(_) => log_warn!("delivery pass timeout (> {}s)", PASS_TIMEOUT_SECS),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("delivery loop shutting down");
                break;
            }
        }
    }
}
