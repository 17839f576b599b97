use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{
        format_datetime, new_id, parse_channel, parse_datetime, parse_delivery_status,
        parse_optional_datetime,
    },
    models::{Delivery, DeliveryInput, DeliveryStatus},
};

const DELIVERY_COLUMNS: &str = "id, capsule_id, status, scheduled_for, delivered_at, channel, \
                                recipient_email, message, token, created_at";

fn row_to_delivery(row: &Row) -> Result<Delivery> {
    let status: String = row.get("status")?;
    let scheduled_for: String = row.get("scheduled_for")?;
    let delivered_at: Option<String> = row.get("delivered_at")?;
    let channel: String = row.get("channel")?;
    let created_at: String = row.get("created_at")?;

    Ok(Delivery {
        id: row.get("id")?,
        capsule_id: row.get("capsule_id")?,
        status: parse_delivery_status(&status)?,
        scheduled_for: parse_datetime(&scheduled_for, "scheduled_for")?,
        delivered_at: parse_optional_datetime(delivered_at, "delivered_at")?,
        channel: parse_channel(&channel)?,
        recipient_email: row.get("recipient_email")?,
        message: row.get("message")?,
        token: row.get("token")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn collect_deliveries(rows: &mut rusqlite::Rows<'_>) -> Result<Vec<Delivery>> {
    let mut deliveries = Vec::new();
    while let Some(row) = rows.next()? {
        deliveries.push(row_to_delivery(row)?);
    }
    Ok(deliveries)
}

impl Database {
    pub async fn schedule_delivery(&self, input: DeliveryInput) -> Result<Delivery> {
        let delivery = Delivery {
            id: new_id(),
            capsule_id: input.capsule_id,
            status: DeliveryStatus::Scheduled,
            scheduled_for: input.scheduled_for,
            delivered_at: None,
            channel: input.channel,
            recipient_email: input.recipient_email,
            message: input.message,
            token: uuid::Uuid::new_v4().simple().to_string(),
            created_at: Utc::now(),
        };

        let record = delivery.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO deliveries (id, capsule_id, status, scheduled_for, delivered_at, channel,
                                         recipient_email, message, token, created_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.capsule_id,
                    record.status.as_str(),
                    format_datetime(&record.scheduled_for),
                    record.channel.as_str(),
                    record.recipient_email,
                    record.message,
                    record.token,
                    format_datetime(&record.created_at),
                ],
            )
            .with_context(|| format!("failed to schedule delivery for capsule {}", record.capsule_id))?;
            Ok(())
        })
        .await?;

        Ok(delivery)
    }

    /// Scheduled deliveries whose time has come, earliest first.
    pub async fn get_due_deliveries(&self, now: DateTime<Utc>) -> Result<Vec<Delivery>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DELIVERY_COLUMNS}
                 FROM deliveries
                 WHERE status = 'scheduled' AND scheduled_for <= ?1
                 ORDER BY scheduled_for ASC, rowid ASC"
            ))?;
            let mut rows = stmt.query(params![format_datetime(&now)])?;
            collect_deliveries(&mut rows)
        })
        .await
    }

    pub async fn list_deliveries_for_capsule(&self, capsule_id: &str) -> Result<Vec<Delivery>> {
        let capsule_id = capsule_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DELIVERY_COLUMNS}
                 FROM deliveries
                 WHERE capsule_id = ?1
                 ORDER BY scheduled_for ASC, rowid ASC"
            ))?;
            let mut rows = stmt.query(params![capsule_id])?;
            collect_deliveries(&mut rows)
        })
        .await
    }

    /// `delivered` stamps `delivered_at` with `at`; any other status clears it.
    pub async fn update_delivery_status(
        &self,
        delivery_id: &str,
        status: DeliveryStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let delivery_id = delivery_id.to_string();
        let delivered_at = (status == DeliveryStatus::Delivered).then(|| format_datetime(&at));
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE deliveries
                 SET status = ?1,
                     delivered_at = ?2
                 WHERE id = ?3",
                params![status.as_str(), delivered_at, delivery_id],
            )?;
            if updated == 0 {
                bail!("delivery {delivery_id} not found");
            }
            Ok(())
        })
        .await
    }
}
