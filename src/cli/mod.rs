pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{config, AppConfig};

#[derive(Parser)]
#[command(name = "certkit")]
#[command(about = "certkit - certificate generation, bulk email and contact card automation")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Root directory for data files (default: $CERTKIT_DATA_DIR or ./data)")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Contact card (vCard) generation from phone numbers")]
    Contacts {
        #[command(subcommand)]
        cmd: commands::contacts::ContactsCommands,
    },

    #[command(about = "Fill PDF certificate templates")]
    Certificates {
        #[command(subcommand)]
        cmd: commands::certificates::CertificatesCommands,
    },

    #[command(about = "Bulk and personalized email over SMTP")]
    Email {
        #[command(subcommand)]
        cmd: commands::email::EmailCommands,
    },

    #[command(about = "External certificate registry operations")]
    Api {
        #[command(subcommand)]
        cmd: commands::api::ApiCommands,
    },

    #[command(about = "Local certificate registry")]
    Registry {
        #[command(subcommand)]
        cmd: commands::registry::RegistryCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let app: AppConfig = match &cli.data_dir {
        Some(dir) => config().clone().with_data_dir(dir),
        None => config().clone(),
    };

    match cli.command {
        Commands::Contacts { cmd } => commands::contacts::handle(cmd, &app, output_format).await,
        Commands::Certificates { cmd } => commands::certificates::handle(cmd, &app, output_format).await,
        Commands::Email { cmd } => commands::email::handle(cmd, &app, output_format).await,
        Commands::Api { cmd } => commands::api::handle(cmd, &app, output_format).await,
        Commands::Registry { cmd } => commands::registry::handle(cmd, &app, output_format).await,
    }
}
