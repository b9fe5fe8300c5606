use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::json;

use crate::api::{ApiConfig, ApiError, CertificateApi, CertificatePatch, CertificateRecord, ListQuery};
use crate::cli::utils::{output_error, output_success, output_value};
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum ApiCommands {
    #[command(about = "Check that the certificate registry answers")]
    Ping,

    #[command(about = "Show a certificate by ID")]
    Get {
        #[arg(help = "Certificate ID")]
        certificate_id: String,
    },

    #[command(about = "Register a certificate (updates it if it already exists)")]
    Create {
        #[arg(long, help = "Recipient name")]
        name: String,
        #[arg(long, help = "Course name")]
        course: String,
        #[arg(long, help = "Certificate ID (default: newly generated)")]
        id: Option<String>,
        #[arg(long, help = "Issue date YYYY-MM-DD (default: today)")]
        issue_date: Option<NaiveDate>,
        #[arg(long, help = "Years until expiry (default: from api_config.json)")]
        years: Option<u32>,
    },

    #[command(about = "Change fields of a registered certificate")]
    Update {
        #[arg(help = "Certificate ID")]
        certificate_id: String,
        #[arg(long, help = "New recipient name")]
        name: Option<String>,
        #[arg(long, help = "New course name")]
        course: Option<String>,
        #[arg(long, help = "New issue date YYYY-MM-DD")]
        issue_date: Option<NaiveDate>,
        #[arg(long, help = "New expiry date YYYY-MM-DD")]
        expiry_date: Option<NaiveDate>,
    },

    #[command(about = "Delete a certificate")]
    Delete {
        #[arg(help = "Certificate ID")]
        certificate_id: String,
    },

    #[command(about = "List certificates page by page")]
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, help = "Filter by recipient, course or ID")]
        search: Option<String>,
    },

    #[command(about = "Find the certificate issued to a recipient")]
    Search {
        #[arg(help = "Recipient name")]
        name: String,
    },
}

/// Report an API failure with its error code in JSON mode
fn fail(output_format: &OutputFormat, err: ApiError) -> anyhow::Error {
    if let OutputFormat::Json = output_format {
        let _ = output_error(output_format, &err.to_string(), Some(err.error_code()));
    }
    err.into()
}

pub async fn handle(cmd: ApiCommands, app: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = ApiConfig::load_or_default(&app.paths.api_config_file(), &app.secrets);
    let default_years = config.default_expiry_years;
    let api = CertificateApi::new(config)?;

    if !api.is_enabled() {
        return Err(fail(&output_format, ApiError::Disabled));
    }

    match cmd {
        ApiCommands::Ping => {
            if api.ping().await {
                output_success(
                    &output_format,
                    "Certificate registry is reachable",
                    Some(json!({ "url": api.config().api_base_url })),
                )
            } else {
                Err(anyhow::anyhow!("Certificate registry is not reachable at {}", api.config().api_base_url))
            }
        }

        ApiCommands::Get { certificate_id } => match api.get(&certificate_id).await {
            Ok(Some(data)) => output_value(&data),
            Ok(None) => Err(anyhow::anyhow!("Certificate '{}' not found", certificate_id)),
            Err(e) => Err(fail(&output_format, e)),
        },

        ApiCommands::Create { name, course, id, issue_date, years } => {
            let years = years.unwrap_or(default_years);
            let record = match id {
                Some(id) => CertificateRecord::with_id(id, &name, &course, issue_date, years),
                None => CertificateRecord::issue(&name, &course, issue_date, years),
            };
            let response = api.create(&record).await.map_err(|e| fail(&output_format, e))?;
            output_value(&response)
        }

        ApiCommands::Update { certificate_id, name, course, issue_date, expiry_date } => {
            let patch = CertificatePatch {
                certificate_id,
                recipient_name: name,
                course_name: course,
                issue_date,
                expiry_date,
            };
            let response = api.update(&patch).await.map_err(|e| fail(&output_format, e))?;
            output_value(&response)
        }

        ApiCommands::Delete { certificate_id } => {
            let response = api.delete(&certificate_id).await.map_err(|e| fail(&output_format, e))?;
            output_value(&response)
        }

        ApiCommands::List { page, limit, search } => {
            let response = api
                .list(&ListQuery { page, limit, search })
                .await
                .map_err(|e| fail(&output_format, e))?;
            output_value(&response)
        }

        ApiCommands::Search { name } => match api.find_by_recipient(&name).await {
            Ok(Some(data)) => output_value(&data),
            Ok(None) => Err(anyhow::anyhow!("No certificate found for '{}'", name)),
            Err(e) => Err(fail(&output_format, e)),
        },
    }
}
