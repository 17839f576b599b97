use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, new_id, parse_datetime, parse_kind},
    models::{Fragment, NewFragment},
};

fn row_to_fragment(row: &Row) -> Result<Fragment> {
    let kind: String = row.get("kind")?;
    let recorded_at: String = row.get("recorded_at")?;

    Ok(Fragment {
        id: row.get("id")?,
        capsule_id: row.get("capsule_id")?,
        kind: parse_kind(&kind)?,
        filename: row.get("filename")?,
        content_text: row.get("content_text")?,
        recorded_at: parse_datetime(&recorded_at, "recorded_at")?,
    })
}

impl Database {
    pub async fn insert_fragment(&self, fragment: NewFragment) -> Result<Fragment> {
        let record = Fragment {
            id: new_id(),
            capsule_id: fragment.capsule_id,
            kind: fragment.kind,
            filename: fragment.filename,
            content_text: fragment.content_text,
            recorded_at: Utc::now(),
        };

        let stored = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO fragments (id, capsule_id, kind, filename, content_text, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    stored.id,
                    stored.capsule_id,
                    stored.kind.as_str(),
                    stored.filename,
                    stored.content_text,
                    format_datetime(&stored.recorded_at),
                ],
            )
            .with_context(|| format!("failed to insert fragment for capsule {}", stored.capsule_id))?;
            Ok(())
        })
        .await?;

        Ok(record)
    }

    /// Oldest first; insertion order breaks timestamp ties.
    pub async fn get_fragments_for_capsule(&self, capsule_id: &str) -> Result<Vec<Fragment>> {
        let capsule_id = capsule_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, capsule_id, kind, filename, content_text, recorded_at
                 FROM fragments
                 WHERE capsule_id = ?1
                 ORDER BY recorded_at ASC, rowid ASC",
            )?;

            let mut rows = stmt.query(params![capsule_id])?;
            let mut fragments = Vec::new();
            while let Some(row) = rows.next()? {
                fragments.push(row_to_fragment(row)?);
            }

            Ok(fragments)
        })
        .await
    }
}
