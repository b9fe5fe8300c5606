//! Certificate filler: one PDF per recipient from a template and a field layout.
pub mod fonts;
pub mod id;
pub mod layout;
pub mod pdf;

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::record::CertificateRecord;
use crate::api::CertificateApi;
use crate::error::{ConfigError, InputError};
use crate::recipients::{read_certificate_recipients, CertificateRecipient};
use crate::registry::log::{append_issued, LogEntry};
use crate::registry::{Registry, StatusUpdate};
use crate::report::RunReport;
use layout::CertificateLayout;
use pdf::{fill_certificate, layout_runs, PdfError};

pub const LAYOUT_FILE_NAME: &str = "config.json";

/// Failures that stop a whole generation run
#[derive(Debug, Error)]
pub enum FillError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Template PDF not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Could not create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FillOptions {
    pub recipients_file: PathBuf,
    pub config_file: PathBuf,
    /// Relative paths, including those inside the layout, resolve against this
    pub base_dir: PathBuf,
    pub issue_date: Option<NaiveDate>,
    pub expiry_years: u32,
}

impl FillOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            recipients_file: PathBuf::from("recipients.txt"),
            config_file: PathBuf::from(LAYOUT_FILE_NAME),
            base_dir: base_dir.into(),
            issue_date: None,
            expiry_years: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    pub record: CertificateRecord,
    pub pdf_path: PathBuf,
}

#[derive(Debug)]
pub struct FillOutcome {
    pub report: RunReport,
    pub output_dir: PathBuf,
    pub issued: Vec<IssuedCertificate>,
}

/// `Jane O'Doe` becomes `Jane_ODoe_certificate.pdf`
pub fn safe_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    format!("{}_certificate.pdf", kept.trim_end().replace(' ', "_"))
}

/// Field values a layout can reference
pub fn field_values(record: &CertificateRecord) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("name", record.recipient_name.clone()),
        ("course", record.course_name.clone()),
        ("certificate_id", record.certificate_id.clone()),
        ("issue_date", record.issue_date.format("%Y-%m-%d").to_string()),
        ("expiry_date", record.expiry_date.format("%Y-%m-%d").to_string()),
    ])
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn fill_one(
    template: &Path,
    layout: &CertificateLayout,
    output_dir: &Path,
    recipient: &CertificateRecipient,
    options: &FillOptions,
) -> Result<IssuedCertificate, PdfError> {
    let record = CertificateRecord::issue(&recipient.name, &recipient.course, options.issue_date, options.expiry_years);
    let pdf_path = output_dir.join(safe_filename(&record.recipient_name));

    fill_certificate(template, &layout_runs(layout, &field_values(&record)), &pdf_path)?;

    Ok(IssuedCertificate { record, pdf_path })
}

/// Output directory named by the layout config, or `<base_dir>/output`
/// when the config is missing or unreadable.
pub fn layout_output_dir(base_dir: &Path, config_file: &Path) -> PathBuf {
    match CertificateLayout::load(&resolve(base_dir, config_file)) {
        Ok(layout) => resolve(base_dir, &layout.output_directory),
        Err(_) => base_dir.join("output"),
    }
}

/// Generate a certificate for every recipient. A recipient that fails is
/// reported and skipped; a missing config, recipients file or template
/// aborts before anything is written.
pub fn generate_certificates(options: &FillOptions, registry: &mut Registry) -> Result<FillOutcome, FillError> {
    let config_file = resolve(&options.base_dir, &options.config_file);
    let recipients_file = resolve(&options.base_dir, &options.recipients_file);

    let layout = CertificateLayout::load(&config_file)?;
    let recipients = read_certificate_recipients(&recipients_file)?;
    let template = resolve(&options.base_dir, &layout.template_pdf);
    let output_dir = resolve(&options.base_dir, &layout.output_directory);
    registry.set_output_dir(&output_dir);

    let mut report = RunReport::new("Certificate Generation");
    if recipients.is_empty() {
        warn!("No valid recipients found in {}", recipients_file.display());
        return Ok(FillOutcome { report, output_dir, issued: Vec::new() });
    }

    if !template.exists() {
        return Err(FillError::TemplateNotFound(template));
    }
    fs::create_dir_all(&output_dir).map_err(|source| FillError::OutputDir {
        path: output_dir.clone(),
        source,
    })?;

    info!("Loaded {} recipients", recipients.len());
    info!("Template: {}", template.display());
    info!("Output directory: {}", output_dir.display());

    let mut issued = Vec::new();
    for (i, recipient) in recipients.iter().enumerate() {
        info!("[{}/{}] Generating certificate for {}", i + 1, recipients.len(), recipient.name);

        match fill_one(&template, &layout, &output_dir, recipient, options) {
            Ok(certificate) => {
                if let Err(e) = registry.register(&certificate.record, Some(certificate.pdf_path.as_path())) {
                    warn!("Could not register {} in the local registry: {}", recipient.name, e);
                }
                info!(
                    "Certificate {} written to {}",
                    certificate.record.certificate_id,
                    certificate.pdf_path.display()
                );
                report.success();
                issued.push(certificate);
            }
            Err(e) => {
                let message = format!("Failed to generate certificate for {}: {}", recipient.name, e);
                warn!("{}", message);
                report.failure(message);
            }
        }
    }

    let log_entries: Vec<LogEntry> = issued
        .iter()
        .map(|c| LogEntry {
            certificate_id: c.record.certificate_id.clone(),
            name: c.record.recipient_name.clone(),
            course: c.record.course_name.clone(),
        })
        .collect();
    let log_path = registry.log_path();
    match append_issued(&log_path, &log_entries) {
        Ok(()) if !log_entries.is_empty() => report.note(format!("Certificate IDs logged to {}", log_path.display())),
        Ok(()) => {}
        Err(e) => warn!("Could not write {}: {}", log_path.display(), e),
    }
    report.note(format!("Output directory: {}", output_dir.display()));

    Ok(FillOutcome { report, output_dir, issued })
}

/// Push freshly issued certificates to the external registry. Failures
/// are reported per certificate and never undo the generated PDFs.
pub async fn register_issued(
    api: &CertificateApi,
    issued: &[IssuedCertificate],
    registry: &mut Registry,
) -> RunReport {
    let mut report = RunReport::new("Certificate API Registration");
    if !api.is_enabled() {
        report.note("API integration disabled; nothing registered");
        return report;
    }

    for certificate in issued {
        let record = &certificate.record;
        match api.create(record).await {
            Ok(_) => {
                if let Err(e) = registry.update_status(&record.recipient_name, StatusUpdate::api_registered()) {
                    warn!("Could not update registry for {}: {}", record.recipient_name, e);
                }
                report.success();
            }
            Err(e) => {
                let message = format!("Failed to register {} ({}): {}", record.recipient_name, record.certificate_id, e);
                warn!("{}", message);
                report.failure(message);
            }
        }
    }
    report
}
