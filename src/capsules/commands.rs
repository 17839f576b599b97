//! Capsule CLI - subcommands that drive a [`CapsuleService`].
//!
//! Every command answers with a JSON value the caller prints.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde_json::{json, Value};

use crate::db::models::{CapsuleInput, DeliveryChannel, DeliveryInput};
use crate::delivery::{deliver_due, DeliveryLog};

use super::CapsuleService;

/// Capsule commands
#[derive(Debug, Subcommand)]
pub enum CapsuleCommands {
    /// Create a capsule
    Create {
        /// Capsule title
        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Who the capsule is for
        #[arg(short, long, default_value = "")]
        recipient: String,

        /// When the capsule should open (RFC 3339)
        #[arg(long)]
        delivery_date: Option<DateTime<Utc>>,

        /// Comma separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// List capsules, newest first
    List,

    /// Show a capsule with its fragments
    Show { capsule_id: String },
}

/// Commands that act on one capsule's content
#[derive(Debug, Subcommand)]
pub enum ContentCommands {
    /// Add a typed note
    AddText { capsule_id: String, text: String },

    /// Upload a file (audio is transcribed, .txt/.md are read)
    AddFile { capsule_id: String, path: PathBuf },

    /// Analyze every fragment and store the result
    Analyze { capsule_id: String },

    /// Write the memory book to the output directory
    MemoryBook { capsule_id: String },
}

/// Delivery commands
#[derive(Debug, Subcommand)]
pub enum DeliveryCommands {
    /// Schedule a capsule for delivery
    Schedule {
        capsule_id: String,

        /// Delivery time (RFC 3339)
        #[arg(long)]
        at: DateTime<Utc>,

        #[arg(long, value_enum, default_value = "log")]
        channel: ChannelArg,

        #[arg(long)]
        email: Option<String>,

        #[arg(short, long)]
        message: Option<String>,
    },

    /// Deliver everything that is due now
    RunDue,

    /// List deliveries of a capsule
    List { capsule_id: String },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ChannelArg {
    Email,
    Log,
}

impl From<ChannelArg> for DeliveryChannel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Email => DeliveryChannel::Email,
            ChannelArg::Log => DeliveryChannel::Log,
        }
    }
}

pub async fn execute_capsule_command(service: &CapsuleService, cmd: CapsuleCommands) -> Result<Value> {
    match cmd {
        CapsuleCommands::Create {
            title,
            description,
            recipient,
            delivery_date,
            tags,
        } => {
            let capsule = service
                .create_capsule(CapsuleInput {
                    title,
                    description,
                    recipient,
                    delivery_date,
                    tags,
                })
                .await?;
            Ok(serde_json::to_value(capsule)?)
        }
        CapsuleCommands::List => Ok(serde_json::to_value(service.list_capsules().await?)?),
        CapsuleCommands::Show { capsule_id } => {
            let capsule = service.get_capsule(&capsule_id).await?;
            let fragments = service.fragments(&capsule_id).await?;
            Ok(json!({ "capsule": capsule, "fragments": fragments }))
        }
    }
}

pub async fn execute_content_command(service: &CapsuleService, cmd: ContentCommands) -> Result<Value> {
    match cmd {
        ContentCommands::AddText { capsule_id, text } => {
            Ok(serde_json::to_value(service.add_text(&capsule_id, text).await?)?)
        }
        ContentCommands::AddFile { capsule_id, path } => {
            Ok(serde_json::to_value(service.add_file(&capsule_id, &path).await?)?)
        }
        ContentCommands::Analyze { capsule_id } => {
            Ok(serde_json::to_value(service.analyze_capsule(&capsule_id).await?)?)
        }
        ContentCommands::MemoryBook { capsule_id } => {
            let (_, path) = service.memory_book(&capsule_id).await?;
            Ok(json!({ "path": path }))
        }
    }
}

pub async fn execute_delivery_command(
    service: &CapsuleService,
    log: &DeliveryLog,
    cmd: DeliveryCommands,
) -> Result<Value> {
    match cmd {
        DeliveryCommands::Schedule {
            capsule_id,
            at,
            channel,
            email,
            message,
        } => {
            let delivery = service
                .schedule_delivery(DeliveryInput {
                    capsule_id,
                    scheduled_for: at,
                    channel: channel.into(),
                    recipient_email: email,
                    message,
                })
                .await?;
            Ok(serde_json::to_value(delivery)?)
        }
        DeliveryCommands::RunDue => {
            let report = deliver_due(service.database(), log, Utc::now())
                .await
                .context("delivery pass failed")?;
            Ok(serde_json::to_value(report)?)
        }
        DeliveryCommands::List { capsule_id } => {
            Ok(serde_json::to_value(service.deliveries(&capsule_id).await?)?)
        }
    }
}
