//! The three send workflows. Each connects once, then sends one message
//! per recipient in list order; a failed send is reported and the run
//! moves on. Only a failed connection aborts.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::attachments::{cleanup_attachments, copy_certificates};
use super::mailer::Mailer;
use super::matching::{certificate_index, find_matching_certificate};
use super::message::OutgoingEmail;
use super::template::render;
use super::throttle::Throttle;
use super::EmailError;
use crate::api::record::CertificateRecord;
use crate::api::CertificateApi;
use crate::recipients::{read_certificate_recipients, AttachmentRecipient, MailRecipient};
use crate::registry::log::{latest_for, read_log};
use crate::registry::{Registry, StatusUpdate, NOT_AVAILABLE, UNKNOWN_COURSE};
use crate::report::RunReport;

/// Same subject, body and attachments to every address
pub async fn send_same_email(
    mailer: &dyn Mailer,
    throttle: &Throttle,
    addresses: &[String],
    subject: &str,
    body: &str,
    attachments: &[PathBuf],
) -> Result<RunReport, EmailError> {
    let mut report = RunReport::new("Email Sending");

    let mut present = Vec::new();
    for path in attachments {
        if path.is_file() {
            present.push(path.clone());
        } else {
            warn!("Attachment not found, skipping: {}", path.display());
            report.note(format!("Skipped missing attachment {}", path.display()));
        }
    }

    if addresses.is_empty() {
        warn!("No recipients to send to");
        return Ok(report);
    }

    mailer.connect().await?;
    info!("Sending to {} recipients with {} attachment(s)", addresses.len(), present.len());

    for (i, address) in addresses.iter().enumerate() {
        info!("[{}/{}] Sending to {}", i + 1, addresses.len(), address);
        let email = OutgoingEmail::new(address, subject, body).with_attachments(present.clone());

        match mailer.send(&email).await {
            Ok(()) => report.success(),
            Err(e) => {
                warn!("Failed to send to {}: {}", address, e);
                report.failure(format!("{}: {}", address, e));
            }
        }
        throttle.wait(i, addresses.len()).await;
    }

    Ok(report)
}

/// Where a recipient's course and certificate ID came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailSource {
    Registry,
    Api,
    LocalFiles,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientDetails {
    pub course_name: String,
    pub cert_id: String,
    pub source: DetailSource,
}

impl RecipientDetails {
    pub fn unknown() -> Self {
        Self {
            course_name: UNKNOWN_COURSE.to_string(),
            cert_id: NOT_AVAILABLE.to_string(),
            source: DetailSource::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        self.cert_id != NOT_AVAILABLE && self.course_name != UNKNOWN_COURSE
    }
}

/// Course and certificate ID for a recipient: the local registry first,
/// then the external registry, then the certificate recipients file and
/// the most recent `certificate_ids.log` entry.
pub async fn resolve_recipient_details(
    name: &str,
    registry: &Registry,
    api: Option<&CertificateApi>,
    certificate_recipients: &Path,
) -> RecipientDetails {
    let fields = registry.template_fields(name);
    if fields.is_known() {
        debug!("Found {} in the local registry", name);
        return RecipientDetails {
            course_name: fields.course_name,
            cert_id: fields.cert_id,
            source: DetailSource::Registry,
        };
    }

    if let Some(api) = api.filter(|a| a.is_enabled()) {
        match api.find_by_recipient(name).await {
            Ok(Some(found)) => {
                debug!("Found {} in the certificate registry service", name);
                let field = |key: &str, fallback: &str| {
                    found.get(key).and_then(Value::as_str).unwrap_or(fallback).to_string()
                };
                return RecipientDetails {
                    course_name: field("course_name", UNKNOWN_COURSE),
                    cert_id: field("certificate_id", NOT_AVAILABLE),
                    source: DetailSource::Api,
                };
            }
            Ok(None) => {}
            Err(e) => warn!("API lookup failed for {}: {}", name, e),
        }
    }

    let mut details = RecipientDetails::unknown();
    let wanted = name.trim().to_uppercase();

    match read_certificate_recipients(certificate_recipients) {
        Ok(rows) => {
            if let Some(row) = rows.iter().find(|r| r.name.to_uppercase() == wanted) {
                details.course_name = row.course.clone();
                details.source = DetailSource::LocalFiles;
            }
        }
        Err(e) => debug!("No local recipients for lookup: {}", e),
    }

    match read_log(&registry.log_path()) {
        Ok(entries) => {
            if let Some(entry) = latest_for(&entries, name) {
                details.cert_id = entry.certificate_id.clone();
                details.source = DetailSource::LocalFiles;
            }
        }
        Err(e) => debug!("No certificate log for lookup: {}", e),
    }

    details
}

/// Settings for a personalized run
#[derive(Debug, Clone)]
pub struct PersonalizedRun {
    pub subject: String,
    pub body_template: String,
    /// Where the matching certificate PDFs are looked up
    pub attachments_dir: PathBuf,
    /// Certificate filler output, copied into `attachments_dir` first
    pub certificate_output_dir: PathBuf,
    /// `Name,Course` list used when neither registry knows a recipient
    pub certificate_recipients: PathBuf,
    pub auto_copy: bool,
    pub auto_cleanup: bool,
    pub expiry_years: u32,
}

/// Make sure the external registry knows the certificate. Returns whether
/// it is registered afterwards.
async fn ensure_registered(
    api: &CertificateApi,
    registry: &Registry,
    name: &str,
    details: &RecipientDetails,
    expiry_years: u32,
) -> bool {
    match api.get(&details.cert_id).await {
        Ok(Some(_)) => {
            debug!("Certificate {} already registered", details.cert_id);
            return true;
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Could not check certificate {}: {}", details.cert_id, e);
            return false;
        }
    }

    let record = registry
        .get(name)
        .filter(|entry| entry.certificate_id == details.cert_id)
        .map(|entry| entry.to_record())
        .unwrap_or_else(|| {
            CertificateRecord::with_id(details.cert_id.clone(), name, &details.course_name, None, expiry_years)
        });

    match api.create(&record).await {
        Ok(_) => {
            info!("Certificate {} registered for verification", record.certificate_id);
            true
        }
        Err(e) => {
            warn!("Registering certificate {} failed: {}", record.certificate_id, e);
            false
        }
    }
}

/// Personalized message with each recipient's own certificate attached
pub async fn send_personalized(
    mailer: &dyn Mailer,
    throttle: &Throttle,
    recipients: &[MailRecipient],
    run: &PersonalizedRun,
    registry: &mut Registry,
    api: Option<&CertificateApi>,
) -> Result<RunReport, EmailError> {
    let mut report = RunReport::new("Personalized Email Sending");
    if recipients.is_empty() {
        warn!("No valid recipients found in email list");
        return Ok(report);
    }

    if run.auto_copy {
        if let Err(e) = copy_certificates(&run.certificate_output_dir, &run.attachments_dir) {
            warn!("Auto-copy of certificates failed: {}", e);
        }
    }

    let certificates = certificate_index(&run.attachments_dir).map_err(|source| EmailError::Attachment {
        path: run.attachments_dir.clone(),
        source,
    })?;
    info!("Found {} recipients and {} certificate files", recipients.len(), certificates.len());

    mailer.connect().await?;
    let api = api.filter(|a| a.is_enabled());
    let mut missing = Vec::new();

    for (i, recipient) in recipients.iter().enumerate() {
        let name = recipient.name.as_str();
        info!("[{}/{}] {} ({})", i + 1, recipients.len(), name, recipient.email);

        let (attachments, details) = match find_matching_certificate(name, &certificates) {
            Some(path) => {
                info!("Found certificate {}", path.display());
                let details = resolve_recipient_details(name, registry, api, &run.certificate_recipients).await;
                (vec![path.to_path_buf()], details)
            }
            None => {
                warn!("No matching certificate found for {}", name);
                missing.push(name.to_string());
                (Vec::new(), RecipientDetails::unknown())
            }
        };

        let mut api_registered = false;
        if let Some(api) = api {
            if details.is_known() {
                api_registered = ensure_registered(api, registry, name, &details, run.expiry_years).await;
            }
        }

        let values = BTreeMap::from([
            ("name", name),
            ("course_name", details.course_name.as_str()),
            ("cert_id", details.cert_id.as_str()),
        ]);
        let body = render(&run.body_template, &values);
        let email = OutgoingEmail::new(&recipient.email, &run.subject, body).with_attachments(attachments);

        match mailer.send(&email).await {
            Ok(()) => {
                let mut update = StatusUpdate::email_sent_now();
                if api_registered {
                    update.api_registered = Some(true);
                }
                if let Err(e) = registry.update_status(name, update) {
                    warn!("Could not update registry for {}: {}", name, e);
                }
                report.success();
            }
            Err(e) => {
                warn!("Failed to send to {}: {}", recipient.email, e);
                report.failure(format!("{}: {}", recipient.email, e));
            }
        }
        throttle.wait(i, recipients.len()).await;
    }

    if !missing.is_empty() {
        report.note(format!("Missing certificates for: {}", missing.join(", ")));
    }

    if run.auto_cleanup && report.succeeded > 0 && report.failed == 0 {
        if let Err(e) = cleanup_attachments(&run.attachments_dir) {
            warn!("Auto-cleanup of attachments failed: {}", e);
        }
    }

    Ok(report)
}

/// Personalized message with the file named in each row attached. A row
/// whose file is missing fails without sending.
pub async fn send_with_attachments(
    mailer: &dyn Mailer,
    throttle: &Throttle,
    recipients: &[AttachmentRecipient],
    subject: &str,
    body_template: &str,
    certificates_dir: &Path,
) -> Result<RunReport, EmailError> {
    let mut report = RunReport::new("Email Sending");
    if recipients.is_empty() {
        warn!("No valid recipients found");
        return Ok(report);
    }
    if !certificates_dir.is_dir() {
        return Err(EmailError::DirectoryNotFound(certificates_dir.to_path_buf()));
    }

    mailer.connect().await?;

    for (i, recipient) in recipients.iter().enumerate() {
        info!("[{}/{}] Processing {}", i + 1, recipients.len(), recipient.email);

        let path = certificates_dir.join(&recipient.file);
        if !path.is_file() {
            let message = format!("{}: Certificate file not found: {}", recipient.email, path.display());
            warn!("{}", message);
            report.failure(message);
            continue;
        }

        let body = render(body_template, &BTreeMap::from([("name", recipient.name.as_str())]));
        let email = OutgoingEmail::new(&recipient.email, subject, body).with_attachments(vec![path]);

        match mailer.send(&email).await {
            Ok(()) => report.success(),
            Err(e) => {
                warn!("Failed to send to {}: {}", recipient.email, e);
                report.failure(format!("Failed to send to {}: {}", recipient.email, e));
            }
        }
        throttle.wait(i, recipients.len()).await;
    }

    Ok(report)
}
