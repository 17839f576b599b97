use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, new_id, parse_datetime, parse_json, parse_optional_datetime, to_json},
    models::{Capsule, CapsuleInput},
};

fn row_to_capsule(row: &Row) -> Result<Capsule> {
    let delivery_date: Option<String> = row.get("delivery_date")?;
    let tags_json: String = row.get("tags_json")?;
    let created_at: String = row.get("created_at")?;

    Ok(Capsule {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        recipient: row.get("recipient")?,
        delivery_date: parse_optional_datetime(delivery_date, "delivery_date")?,
        tags: parse_json(&tags_json, "tags_json")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn create_capsule(&self, input: CapsuleInput) -> Result<Capsule> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            bail!("capsule title must not be empty");
        }

        let capsule = Capsule {
            id: new_id(),
            title,
            description: input.description,
            recipient: input.recipient,
            delivery_date: input.delivery_date,
            tags: input.tags,
            created_at: Utc::now(),
        };

        let record = capsule.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO capsules (id, title, description, recipient, delivery_date, tags_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.title,
                    record.description,
                    record.recipient,
                    record.delivery_date.as_ref().map(format_datetime),
                    to_json(&record.tags, "tags")?,
                    format_datetime(&record.created_at),
                ],
            )
            .context("failed to insert capsule")?;
            Ok(())
        })
        .await?;

        Ok(capsule)
    }

    pub async fn get_capsule(&self, capsule_id: &str) -> Result<Option<Capsule>> {
        let capsule_id = capsule_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, recipient, delivery_date, tags_json, created_at
                 FROM capsules
                 WHERE id = ?1",
            )?;
            let raw = stmt
                .query_row(params![capsule_id], |row| {
                    Ok(row_to_capsule(row))
                })
                .optional()?;
            raw.transpose()
        })
        .await
    }

    /// Newest first.
    pub async fn list_capsules(&self) -> Result<Vec<Capsule>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, recipient, delivery_date, tags_json, created_at
                 FROM capsules
                 ORDER BY created_at DESC, rowid DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut capsules = Vec::new();
            while let Some(row) = rows.next()? {
                capsules.push(row_to_capsule(row)?);
            }

            Ok(capsules)
        })
        .await
    }
}
