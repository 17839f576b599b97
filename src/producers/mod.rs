//! Text producers: typed notes, speech-to-text and file-derived text.
//!
//! A producer either yields text, reports that it ran and found nothing
//! ([`ProducedText::Nothing`]), or fails with a [`ProducerError`]. The capsule
//! service decides which failures are fatal.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::log_debug;

const ENABLE_LOGS: bool = true;

pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "flac", "ogg"];
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Where a fragment's text came from. Stored as `text`, `audio` or `file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FragmentKind {
    Typed,
    Transcribed,
    FileDerived,
}

impl FragmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FragmentKind::Typed => "text",
            FragmentKind::Transcribed => "audio",
            FragmentKind::FileDerived => "file",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "text" => Some(FragmentKind::Typed),
            "audio" => Some(FragmentKind::Transcribed),
            "file" => Some(FragmentKind::FileDerived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducedText {
    Text(String),
    Nothing,
}

impl ProducedText {
    /// Blank output counts as nothing produced.
    pub fn from_output(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            ProducedText::Nothing
        } else {
            ProducedText::Text(trimmed.to_string())
        }
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            ProducedText::Text(text) => Some(text),
            ProducedText::Nothing => None,
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, ProducedText::Nothing)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("file {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("no transcriber is configured")]
    TranscriberUnavailable,

    #[error("transcription of {} failed: {message}", .path.display())]
    Transcription { path: PathBuf, message: String },

    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", .0.display())]
    Encoding(PathBuf),
}

/// Speech-to-text capability.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &Path, language: &str) -> Result<ProducedText, ProducerError>;
}

/// Runs an external speech-to-text program: `<argv...> <file> --language <lang>`.
/// The trimmed stdout is the transcript.
#[derive(Debug, Clone)]
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
}

impl CommandTranscriber {
    /// `None` when `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&self, audio: &Path, language: &str) -> Result<ProducedText, ProducerError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(audio)
            .arg("--language")
            .arg(language)
            .output()
            .map_err(|err| ProducerError::Transcription {
                path: audio.to_path_buf(),
                message: format!("could not run {}: {err}", self.program),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProducerError::Transcription {
                path: audio.to_path_buf(),
                message: format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            });
        }

        Ok(ProducedText::from_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Outcome of ingesting one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub kind: FragmentKind,
    pub text: ProducedText,
}

/// Turns an uploaded file into fragment text based on its extension.
#[derive(Clone)]
pub struct FileIngestor {
    transcriber: Option<Arc<dyn Transcriber>>,
    language: String,
}

impl FileIngestor {
    pub fn new(transcriber: Option<Arc<dyn Transcriber>>, language: impl Into<String>) -> Self {
        Self {
            transcriber,
            language: language.into(),
        }
    }

    pub fn produce(&self, path: &Path) -> Result<Ingested, ProducerError> {
        if !path.is_file() {
            return Err(ProducerError::Missing(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            let transcriber = self
                .transcriber
                .as_ref()
                .ok_or(ProducerError::TranscriberUnavailable)?;
            let text = transcriber.transcribe(path, &self.language)?;
            // Audio that yields no transcript is kept as a plain file.
            let kind = if text.is_nothing() {
                FragmentKind::FileDerived
            } else {
                FragmentKind::Transcribed
            };
            log_debug!("transcribed {} (text: {})", path.display(), !text.is_nothing());
            return Ok(Ingested { kind, text });
        }

        if TEXT_EXTENSIONS.contains(&extension.as_str()) {
            let bytes = fs::read(path).map_err(|source| ProducerError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let contents =
                String::from_utf8(bytes).map_err(|_| ProducerError::Encoding(path.to_path_buf()))?;
            return Ok(Ingested {
                kind: FragmentKind::FileDerived,
                text: ProducedText::from_output(&contents),
            });
        }

        Ok(Ingested {
            kind: FragmentKind::FileDerived,
            text: ProducedText::Nothing,
        })
    }
}
