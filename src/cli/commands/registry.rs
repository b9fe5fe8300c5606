use clap::Subcommand;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::api::ApiConfig;
use crate::certificates::{layout_output_dir, LAYOUT_FILE_NAME};
use crate::cli::utils::{output_empty_collection, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::registry::Registry;

#[derive(Subcommand)]
pub enum RegistryCommands {
    #[command(about = "List every certificate in the local registry")]
    List {
        #[arg(short = 'd', long, help = "Certificates directory (default: <data>/certificates)")]
        base_dir: Option<PathBuf>,
    },

    #[command(about = "Show the registry entry for a recipient")]
    Show {
        #[arg(help = "Recipient name (case-insensitive)")]
        name: String,
        #[arg(short = 'd', long, help = "Certificates directory (default: <data>/certificates)")]
        base_dir: Option<PathBuf>,
    },

    #[command(about = "Rewrite certificate_ids.log from the registry")]
    Export {
        #[arg(short = 'd', long, help = "Certificates directory (default: <data>/certificates)")]
        base_dir: Option<PathBuf>,
    },

    #[command(about = "Import certificate_ids.log entries the registry does not know")]
    Sync {
        #[arg(short = 'd', long, help = "Certificates directory (default: <data>/certificates)")]
        base_dir: Option<PathBuf>,
    },
}

pub async fn handle(cmd: RegistryCommands, app: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let open = |base_dir: Option<PathBuf>| {
        let base_dir = base_dir.unwrap_or_else(|| app.paths.certificates_dir.clone());
        Registry::open(&base_dir).with_output_dir(layout_output_dir(&base_dir, Path::new(LAYOUT_FILE_NAME)))
    };

    match cmd {
        RegistryCommands::List { base_dir } => {
            let registry = open(base_dir);
            if registry.is_empty() {
                return output_empty_collection(&output_format, "certificates", "No certificates registered");
            }

            match output_format {
                OutputFormat::Json => {
                    let entries: Vec<_> = registry.all().collect();
                    println!("{}", serde_json::to_string_pretty(&json!({ "certificates": entries }))?);
                }
                OutputFormat::Text => {
                    println!("{:<22} {:<30} {:<30} {:<11} {:<5} {:<5}", "ID", "NAME", "COURSE", "EXPIRES", "EMAIL", "API");
                    for entry in registry.all() {
                        println!(
                            "{:<22} {:<30} {:<30} {:<11} {:<5} {:<5}",
                            entry.certificate_id,
                            entry.name,
                            entry.course,
                            entry.expiry_date,
                            if entry.email_sent { "yes" } else { "no" },
                            if entry.api_registered { "yes" } else { "no" },
                        );
                    }
                }
            }
            Ok(())
        }

        RegistryCommands::Show { name, base_dir } => {
            let registry = open(base_dir);
            let entry = registry
                .get(&name)
                .ok_or_else(|| anyhow::anyhow!("No certificate registered for '{}'", name))?;
            println!("{}", serde_json::to_string_pretty(entry)?);
            Ok(())
        }

        RegistryCommands::Export { base_dir } => {
            let registry = open(base_dir);
            let path = registry.export_log()?;
            output_success(
                &output_format,
                &format!("Exported {} certificate(s) to {}", registry.len(), path.display()),
                Some(json!({ "count": registry.len(), "log_file": path })),
            )
        }

        RegistryCommands::Sync { base_dir } => {
            let mut registry = open(base_dir);
            let years = ApiConfig::load_or_default(&app.paths.api_config_file(), &app.secrets).default_expiry_years;
            let added = registry.sync_from_log(years)?;
            output_success(
                &output_format,
                &format!("Imported {} certificate(s) from {}", added, registry.log_path().display()),
                Some(json!({ "imported": added })),
            )
        }
    }
}
