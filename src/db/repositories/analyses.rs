use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::analysis::AnalysisResult;
use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, parse_json, to_json},
    models::StoredAnalysis,
};

fn row_to_analysis(row: &Row) -> Result<StoredAnalysis> {
    let profile_json: String = row.get("emotion_profile_json")?;
    let themes_json: String = row.get("themes_json")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(StoredAnalysis {
        capsule_id: row.get("capsule_id")?,
        result: AnalysisResult {
            summary: row.get("summary")?,
            emotion_profile: parse_json(&profile_json, "emotion_profile_json")?,
            themes: parse_json(&themes_json, "themes_json")?,
        },
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Replaces any earlier analysis of the capsule. Concurrent writers: last write wins.
    pub async fn upsert_analysis(
        &self,
        capsule_id: &str,
        result: &AnalysisResult,
    ) -> Result<StoredAnalysis> {
        let stored = StoredAnalysis {
            capsule_id: capsule_id.to_string(),
            result: result.clone(),
            updated_at: Utc::now(),
        };

        let record = stored.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO analyses (capsule_id, summary, emotion_profile_json, themes_json, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(capsule_id) DO UPDATE SET
                     summary = excluded.summary,
                     emotion_profile_json = excluded.emotion_profile_json,
                     themes_json = excluded.themes_json,
                     updated_at = excluded.updated_at",
                params![
                    record.capsule_id,
                    record.result.summary,
                    to_json(&record.result.emotion_profile, "emotion_profile")?,
                    to_json(&record.result.themes, "themes")?,
                    format_datetime(&record.updated_at),
                ],
            )
            .with_context(|| format!("failed to store analysis for capsule {}", record.capsule_id))?;
            Ok(())
        })
        .await?;

        Ok(stored)
    }

    pub async fn get_analysis(&self, capsule_id: &str) -> Result<Option<StoredAnalysis>> {
        let capsule_id = capsule_id.to_string();
        self.execute(move |conn| {
            let raw = conn
                .query_row(
                    "SELECT capsule_id, summary, emotion_profile_json, themes_json, updated_at
                     FROM analyses
                     WHERE capsule_id = ?1",
                    params![capsule_id],
                    |row| Ok(row_to_analysis(row)),
                )
                .optional()?;
            raw.transpose()
        })
        .await
    }
}
