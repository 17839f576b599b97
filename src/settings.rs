use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::analysis::AnalysisConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TranscriptionSettings {
    pub language: String,
    /// External speech-to-text argv; empty means no transcriber.
    pub command: Vec<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            language: "en-US".into(),
            command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeliverySettings {
    pub poll_interval_secs: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    analysis: AnalysisConfig,
    transcription: TranscriptionSettings,
    delivery: DeliverySettings,
}

/// `settings.json` in the data directory, cached in memory.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings in {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn analysis(&self) -> AnalysisConfig {
        self.read().analysis.clone()
    }

    pub fn transcription(&self) -> TranscriptionSettings {
        self.read().transcription.clone()
    }

    pub fn delivery(&self) -> DeliverySettings {
        self.read().delivery.clone()
    }

    pub fn update_analysis(&self, config: AnalysisConfig) -> Result<()> {
        let mut guard = self.write();
        guard.analysis = config;
        self.persist(&guard)
    }

    pub fn update_transcription(&self, settings: TranscriptionSettings) -> Result<()> {
        let mut guard = self.write();
        guard.transcription = settings;
        self.persist(&guard)
    }

    pub fn update_delivery(&self, settings: DeliverySettings) -> Result<()> {
        let mut guard = self.write();
        guard.delivery = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
