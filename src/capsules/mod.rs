//! Capsule workflows: collecting fragments, analyzing them and rendering the memory book.

pub mod commands;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::themes::effective_cluster_count;
use crate::analysis::{AnalysisEngine, AnalysisResult};
use crate::db::models::{Capsule, CapsuleInput, Delivery, DeliveryInput, Fragment, NewFragment};
use crate::db::Database;
use crate::producers::{FileIngestor, FragmentKind, ProducerError};
use crate::report::MemoryBook;
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

const FALLBACK_UPLOAD_NAME: &str = "uploaded.bin";

#[derive(Debug, thiserror::Error)]
#[error("capsule {0} not found")]
pub struct CapsuleNotFound(pub String);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedFile {
    pub fragment: Fragment,
    pub transcribed: bool,
}

#[derive(Clone)]
pub struct CapsuleService {
    db: Database,
    engine: Arc<AnalysisEngine>,
    ingestor: FileIngestor,
    data_dir: PathBuf,
}

impl CapsuleService {
    pub fn new(db: Database, engine: AnalysisEngine, ingestor: FileIngestor, data_dir: PathBuf) -> Self {
        Self {
            db,
            engine: Arc::new(engine),
            ingestor,
            data_dir,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("output")
    }

    async fn require_capsule(&self, capsule_id: &str) -> Result<Capsule> {
        self.db
            .get_capsule(capsule_id)
            .await?
            .ok_or_else(|| CapsuleNotFound(capsule_id.to_string()).into())
    }

    pub async fn create_capsule(&self, input: CapsuleInput) -> Result<Capsule> {
        let capsule = self.db.create_capsule(input).await?;
        log_info!("created capsule {} ({})", capsule.id, capsule.title);
        Ok(capsule)
    }

    pub async fn list_capsules(&self) -> Result<Vec<Capsule>> {
        self.db.list_capsules().await
    }

    pub async fn get_capsule(&self, capsule_id: &str) -> Result<Capsule> {
        self.require_capsule(capsule_id).await
    }

    pub async fn add_text(&self, capsule_id: &str, text: String) -> Result<Fragment> {
        self.require_capsule(capsule_id).await?;
        self.db
            .insert_fragment(NewFragment {
                capsule_id: capsule_id.to_string(),
                kind: FragmentKind::Typed,
                filename: None,
                content_text: Some(text),
            })
            .await
    }

    /// Stores a copy of `source` under the uploads directory and records a
    /// fragment with whatever text the file yields.
    pub async fn add_file(&self, capsule_id: &str, source: &Path) -> Result<AddedFile> {
        self.require_capsule(capsule_id).await?;

        let original_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_UPLOAD_NAME);
        let stored_name = format!("capsule_{capsule_id}_{original_name}");
        let uploads = self.uploads_dir();
        fs::create_dir_all(&uploads)
            .with_context(|| format!("failed to create {}", uploads.display()))?;
        let destination = uploads.join(&stored_name);
        fs::copy(source, &destination).with_context(|| {
            format!("failed to copy {} to {}", source.display(), destination.display())
        })?;

        let ingestor = self.ingestor.clone();
        let target = destination.clone();
        let produced = tokio::task::spawn_blocking(move || ingestor.produce(&target))
            .await
            .context("file ingestion task panicked")?;

        let (kind, content_text) = match produced {
            Ok(ingested) => (ingested.kind, ingested.text.into_option()),
            Err(ProducerError::TranscriberUnavailable) => {
                log_warn!("no transcriber configured, storing {stored_name} without text");
                (FragmentKind::FileDerived, None)
            }
            Err(err) => return Err(err).context(format!("failed to ingest {stored_name}")),
        };

        let transcribed = kind == FragmentKind::Transcribed;
        let fragment = self
            .db
            .insert_fragment(NewFragment {
                capsule_id: capsule_id.to_string(),
                kind,
                filename: Some(stored_name),
                content_text,
            })
            .await?;

        Ok(AddedFile {
            fragment,
            transcribed,
        })
    }

    pub async fn fragments(&self, capsule_id: &str) -> Result<Vec<Fragment>> {
        self.require_capsule(capsule_id).await?;
        self.db.get_fragments_for_capsule(capsule_id).await
    }

    /// Re-analyzes every fragment of the capsule and replaces the stored result.
    pub async fn analyze_capsule(&self, capsule_id: &str) -> Result<AnalysisResult> {
        self.require_capsule(capsule_id).await?;
        let fragments = self.db.get_fragments_for_capsule(capsule_id).await?;
        let total = fragments.len();
        let texts: Vec<String> = fragments
            .into_iter()
            .filter_map(|fragment| fragment.content_text)
            .collect();
        let with_text = texts.iter().filter(|text| !text.trim().is_empty()).count();
        let k = effective_cluster_count(self.engine.config().cluster_count, with_text);

        let started = Instant::now();
        let engine = Arc::clone(&self.engine);
        let result = tokio::task::spawn_blocking(move || engine.analyze(&texts))
            .await
            .context("analysis task panicked")?
            .with_context(|| format!("analysis of capsule {capsule_id} failed"))?;

        self.db.upsert_analysis(capsule_id, &result).await?;

        log_info!(
            "analyzed capsule {} ({} of {} fragments with text, k={}, {} themes) in {}ms",
            capsule_id,
            with_text,
            total,
            k,
            result.themes.len(),
            started.elapsed().as_millis()
        );
        Ok(result)
    }

    /// Builds the memory book and writes it to `<data>/output`.
    pub async fn memory_book(&self, capsule_id: &str) -> Result<(MemoryBook, PathBuf)> {
        let capsule = self.require_capsule(capsule_id).await?;
        let fragments = self.db.get_fragments_for_capsule(capsule_id).await?;
        let analysis = self.db.get_analysis(capsule_id).await?;

        let book = MemoryBook::build(&capsule, &fragments, analysis.as_ref());
        let path = book.write_to(&self.output_dir())?;
        log_info!("memory book for capsule {} written to {}", capsule_id, path.display());
        Ok((book, path))
    }

    pub async fn schedule_delivery(&self, input: DeliveryInput) -> Result<Delivery> {
        self.require_capsule(&input.capsule_id).await?;
        let delivery = self.db.schedule_delivery(input).await?;
        log_info!(
            "scheduled delivery {} of capsule {} for {}",
            delivery.id,
            delivery.capsule_id,
            delivery.scheduled_for
        );
        Ok(delivery)
    }

    pub async fn deliveries(&self, capsule_id: &str) -> Result<Vec<Delivery>> {
        self.require_capsule(capsule_id).await?;
        self.db.list_deliveries_for_capsule(capsule_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisConfig;
    use tempfile::TempDir;

    async fn service(dir: &TempDir) -> CapsuleService {
        let db = Database::new(dir.path().join("lifecache.sqlite3")).unwrap();
        let engine = AnalysisEngine::new(AnalysisConfig::default()).unwrap();
        CapsuleService::new(db, engine, FileIngestor::new(None, "en-US"), dir.path().to_path_buf())
    }

    async fn capsule(service: &CapsuleService) -> Capsule {
        service
            .create_capsule(CapsuleInput {
                title: "Summer letters".into(),
                ..CapsuleInput::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_capsule_is_not_found() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        let err = service.analyze_capsule("nope").await.unwrap_err();
        assert!(err.downcast_ref::<CapsuleNotFound>().is_some());
        let err = service.add_text("nope", "hi".into()).await.unwrap_err();
        assert!(err.downcast_ref::<CapsuleNotFound>().is_some());
    }

    #[tokio::test]
    async fn test_empty_capsule_analyzes_to_empty_state() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        let capsule = capsule(&service).await;
        let result = service.analyze_capsule(&capsule.id).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_audio_without_transcriber_is_stored_as_file() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        let capsule = capsule(&service).await;

        let source = dir.path().join("hello.wav");
        fs::write(&source, b"RIFF").unwrap();
        let added = service.add_file(&capsule.id, &source).await.unwrap();

        assert!(!added.transcribed);
        assert_eq!(added.fragment.kind, FragmentKind::FileDerived);
        assert_eq!(added.fragment.content_text, None);
        let stored_name = format!("capsule_{}_hello.wav", capsule.id);
        assert_eq!(added.fragment.filename.as_deref(), Some(stored_name.as_str()));
        assert!(service.uploads_dir().join(stored_name).exists());
    }

    #[tokio::test]
    async fn test_missing_upload_is_an_error() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        let capsule = capsule(&service).await;
        assert!(service
            .add_file(&capsule.id, &dir.path().join("absent.txt"))
            .await
            .is_err());
        assert!(service.fragments(&capsule.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_file_feeds_analysis() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        let capsule = capsule(&service).await;

        let source = dir.path().join("letter.txt");
        fs::write(&source, "I am so happy and grateful for you.").unwrap();
        service.add_file(&capsule.id, &source).await.unwrap();
        service.add_text(&capsule.id, "   ".into()).await.unwrap();

        let result = service.analyze_capsule(&capsule.id).await.unwrap();
        assert_eq!(result.summary, "I am so happy and grateful for you.");
        assert_eq!(result.themes, vec!["cluster_0"]);
        assert!(!result.emotion_profile.is_empty());
    }
}
