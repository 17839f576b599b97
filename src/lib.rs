pub mod analysis;
pub mod capsules;
pub mod db;
pub mod delivery;
pub mod producers;
pub mod report;
pub mod settings;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::time::Duration;

use analysis::AnalysisEngine;
use capsules::commands::{
    execute_capsule_command, execute_content_command, execute_delivery_command, CapsuleCommands,
    ContentCommands, DeliveryCommands,
};
use capsules::CapsuleService;
use db::Database;
use delivery::{DeliveryController, DeliveryLog};
use producers::{CommandTranscriber, FileIngestor, Transcriber};
use settings::SettingsStore;

/// LifeCache - collect memory fragments into capsules, analyze and deliver them
#[derive(Debug, Parser)]
#[command(name = "lifecache")]
#[command(about = "Emotion profiles, themes and summaries for time capsules")]
#[command(version)]
pub struct Cli {
    /// Directory holding the database, settings, uploads and output
    #[arg(long, env = "LIFECACHE_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create, list and inspect capsules
    #[command(subcommand)]
    Capsule(CapsuleCommands),

    #[command(flatten)]
    Content(ContentCommands),

    /// Schedule and run deliveries
    #[command(subcommand)]
    Delivery(DeliveryCommands),

    /// Run the delivery loop until Ctrl-C
    Serve,
}

pub struct AppState {
    pub data_dir: PathBuf,
    pub db: Database,
    pub settings: SettingsStore,
    pub capsules: CapsuleService,
}

impl AppState {
    /// Opens (or creates) everything under `data_dir`.
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("lifecache.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;

        let engine = AnalysisEngine::new(settings.analysis()).context("invalid analysis settings")?;
        let transcription = settings.transcription();
        let transcriber = CommandTranscriber::from_argv(&transcription.command)
            .map(|t| Arc::new(t) as Arc<dyn Transcriber>);
        let ingestor = FileIngestor::new(transcriber, transcription.language);

        let capsules = CapsuleService::new(db.clone(), engine, ingestor, data_dir.clone());

        Ok(Self {
            data_dir,
            db,
            settings,
            capsules,
        })
    }

    pub fn delivery_log(&self) -> DeliveryLog {
        DeliveryLog::in_data_dir(&self.data_dir)
    }
}

async fn serve(state: &AppState) -> Result<()> {
    let interval = Duration::from_secs(state.settings.delivery().poll_interval_secs);
    let mut controller = DeliveryController::new();
    controller.start(state.db.clone(), state.delivery_log(), interval)?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    log::info!("Ctrl-C received, stopping delivery loop");
    controller.stop().await
}

pub async fn dispatch(state: &AppState, command: Commands) -> Result<Option<serde_json::Value>> {
    let output = match command {
        Commands::Capsule(cmd) => execute_capsule_command(&state.capsules, cmd).await?,
        Commands::Content(cmd) => execute_content_command(&state.capsules, cmd).await?,
        Commands::Delivery(cmd) => {
            execute_delivery_command(&state.capsules, &state.delivery_log(), cmd).await?
        }
        Commands::Serve => {
            serve(state).await?;
            return Ok(None);
        }
    };
    Ok(Some(output))
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let state = AppState::open(cli.data_dir)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    if let Some(output) = runtime.block_on(dispatch(&state, cli.command))? {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}
