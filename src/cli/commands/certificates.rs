use clap::Subcommand;
use std::path::PathBuf;

use crate::api::{ApiConfig, CertificateApi};
use crate::certificates::{generate_certificates, register_issued, FillOptions};
use crate::cli::utils::finish_report;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::registry::Registry;

#[derive(Subcommand)]
pub enum CertificatesCommands {
    #[command(about = "Generate one certificate PDF per recipient from the template")]
    Fill {
        #[arg(short, long, default_value = "recipients.txt", help = "Name,Course list, relative to the base directory")]
        recipients: PathBuf,
        #[arg(short, long, default_value = "config.json", help = "Field layout config, relative to the base directory")]
        config: PathBuf,
        #[arg(short = 'd', long, help = "Base directory for certificate files (default: <data>/certificates)")]
        base_dir: Option<PathBuf>,
        #[arg(long, help = "Register every generated certificate with the external registry")]
        register_api: bool,
    },
}

pub async fn handle(cmd: CertificatesCommands, app: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CertificatesCommands::Fill { recipients, config, base_dir, register_api } => {
            let api_config = ApiConfig::load_or_default(&app.paths.api_config_file(), &app.secrets);
            let base_dir = base_dir.unwrap_or_else(|| app.paths.certificates_dir.clone());

            let mut options = FillOptions::new(&base_dir);
            options.recipients_file = recipients;
            options.config_file = config;
            options.expiry_years = api_config.default_expiry_years;

            let mut registry = Registry::open(&base_dir);
            let outcome = generate_certificates(&options, &mut registry)?;
            let mut report = outcome.report;

            if register_api {
                let api = CertificateApi::new(api_config)?;
                let pushed = register_issued(&api, &outcome.issued, &mut registry).await;
                report.note(format!(
                    "Registered {}/{} certificate(s) with the external registry",
                    pushed.succeeded,
                    outcome.issued.len()
                ));
                report.notes.extend(pushed.errors);
            }

            finish_report(&output_format, report)
        }
    }
}
