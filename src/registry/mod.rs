//! Local certificate registry.
//!
//! `certificate_registry.json` under the certificates directory maps each
//! recipient (trimmed, lowercased name) to the exact name, course and ID
//! that went into their PDF, so the email text and the API payload use
//! the same values. The external registry stays the source of truth.

pub mod log;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::record::{expiry_date, today, CertificateRecord};
use log::LogEntry;

pub const REGISTRY_FILE_NAME: &str = "certificate_registry.json";
pub const REGISTRY_VERSION: &str = "1.0";
pub const UNKNOWN_COURSE: &str = "Unknown Course";
pub const NOT_AVAILABLE: &str = "Not Available";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not serialize registry: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub course: String,
    pub certificate_id: String,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub registration_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub pdf_generated: bool,
    #[serde(default)]
    pub pdf_path: Option<PathBuf>,
    #[serde(default)]
    pub email_sent: bool,
    #[serde(default)]
    pub api_registered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_timestamp: Option<DateTime<Utc>>,
}

impl RegistryEntry {
    pub fn to_record(&self) -> CertificateRecord {
        CertificateRecord {
            certificate_id: self.certificate_id.clone(),
            recipient_name: self.name.clone(),
            course_name: self.course.clone(),
            issue_date: self.issue_date,
            expiry_date: self.expiry_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryMetadata {
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub version: String,
}

impl Default for RegistryMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self { created: now, last_updated: now, version: REGISTRY_VERSION.to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    certificates: BTreeMap<String, RegistryEntry>,
    #[serde(default)]
    metadata: RegistryMetadata,
}

/// Status flags to change on an existing entry; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub email_sent: Option<bool>,
    pub api_registered: Option<bool>,
    pub email_timestamp: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    pub fn email_sent_now() -> Self {
        Self { email_sent: Some(true), email_timestamp: Some(Utc::now()), ..Default::default() }
    }

    pub fn api_registered() -> Self {
        Self { api_registered: Some(true), ..Default::default() }
    }
}

/// Values substituted into email templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateFields {
    pub name: String,
    pub course_name: String,
    pub cert_id: String,
}

impl TemplateFields {
    pub fn unknown(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            course_name: UNKNOWN_COURSE.to_string(),
            cert_id: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.cert_id != NOT_AVAILABLE
    }
}

pub fn lookup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    output_dir: PathBuf,
    data: RegistryFile,
}

impl Registry {
    /// Open the registry under a certificates directory. A missing or
    /// unreadable file starts an empty registry.
    pub fn open(base_dir: &Path) -> Self {
        let path = base_dir.join(REGISTRY_FILE_NAME);
        let data = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Could not load registry {}: {}", path.display(), e);
                RegistryFile::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RegistryFile::default(),
            Err(e) => {
                warn!("Could not load registry {}: {}", path.display(), e);
                RegistryFile::default()
            }
        };

        Self { path, output_dir: base_dir.join("output"), data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point `certificate_ids.log` at another output directory. Defaults to
    /// `<certificates dir>/output`.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.set_output_dir(output_dir);
        self
    }

    pub fn set_output_dir(&mut self, output_dir: impl Into<PathBuf>) {
        self.output_dir = output_dir.into();
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir.join(log::LOG_FILE_NAME)
    }

    pub fn metadata(&self) -> &RegistryMetadata {
        &self.data.metadata
    }

    pub fn len(&self) -> usize {
        self.data.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.certificates.is_empty()
    }

    /// Record an issued certificate, replacing any earlier entry for the
    /// same recipient.
    pub fn register(
        &mut self,
        record: &CertificateRecord,
        pdf_path: Option<&Path>,
    ) -> Result<RegistryEntry, RegistryError> {
        let entry = RegistryEntry {
            name: record.recipient_name.trim().to_string(),
            course: record.course_name.trim().to_string(),
            certificate_id: record.certificate_id.clone(),
            issue_date: record.issue_date,
            expiry_date: record.expiry_date,
            registration_timestamp: Utc::now(),
            pdf_generated: pdf_path.is_some(),
            pdf_path: pdf_path.map(Path::to_path_buf),
            email_sent: false,
            api_registered: false,
            email_timestamp: None,
        };

        self.data.certificates.insert(lookup_key(&record.recipient_name), entry.clone());
        self.save()?;

        info!(
            "Registered certificate {} for {} (valid until {})",
            entry.certificate_id, entry.name, entry.expiry_date
        );
        Ok(entry)
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.data.certificates.get(&lookup_key(name))
    }

    pub fn all(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.data.certificates.values()
    }

    /// Apply status flags. Returns `false` when the name is not registered.
    pub fn update_status(&mut self, name: &str, update: StatusUpdate) -> Result<bool, RegistryError> {
        let Some(entry) = self.data.certificates.get_mut(&lookup_key(name)) else {
            return Ok(false);
        };

        if let Some(sent) = update.email_sent {
            entry.email_sent = sent;
        }
        if let Some(registered) = update.api_registered {
            entry.api_registered = registered;
        }
        if update.email_timestamp.is_some() {
            entry.email_timestamp = update.email_timestamp;
        }

        self.save()?;
        Ok(true)
    }

    pub fn template_fields(&self, name: &str) -> TemplateFields {
        match self.get(name) {
            Some(entry) => TemplateFields {
                name: entry.name.clone(),
                course_name: entry.course.clone(),
                cert_id: entry.certificate_id.clone(),
            },
            None => TemplateFields::unknown(name),
        }
    }

    pub fn save(&mut self) -> Result<(), RegistryError> {
        self.data.metadata.last_updated = Utc::now();
        let json = serde_json::to_string_pretty(&self.data)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| RegistryError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Write then rename so a crash never leaves a half-written registry
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| RegistryError::Write { path: tmp.clone(), source })?;
        fs::rename(&tmp, &self.path).map_err(|source| RegistryError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Rewrite `certificate_ids.log` from the registry contents
    pub fn export_log(&self) -> Result<PathBuf, RegistryError> {
        let path = self.log_path();
        let entries: Vec<LogEntry> = self
            .all()
            .map(|e| LogEntry {
                certificate_id: e.certificate_id.clone(),
                name: e.name.clone(),
                course: e.course.clone(),
            })
            .collect();

        log::write_export(&path, &entries).map_err(|source| RegistryError::Write { path: path.clone(), source })?;
        info!("Exported {} certificate(s) to {}", entries.len(), path.display());
        Ok(path)
    }

    /// Import log entries for recipients the registry does not know yet.
    /// Imported entries are dated today. Returns how many were added.
    pub fn sync_from_log(&mut self, expiry_years: u32) -> Result<usize, RegistryError> {
        let path = self.log_path();
        let entries = log::read_log(&path).map_err(|source| RegistryError::Read { path: path.clone(), source })?;

        let issued = today();
        let mut added = 0;
        for entry in entries {
            let key = lookup_key(&entry.name);
            if self.data.certificates.contains_key(&key) {
                continue;
            }
            self.data.certificates.insert(
                key,
                RegistryEntry {
                    name: entry.name,
                    course: entry.course,
                    certificate_id: entry.certificate_id,
                    issue_date: issued,
                    expiry_date: expiry_date(issued, expiry_years),
                    registration_timestamp: Utc::now(),
                    pdf_generated: false,
                    pdf_path: None,
                    email_sent: false,
                    api_registered: false,
                    email_timestamp: None,
                },
            );
            added += 1;
        }

        if added > 0 {
            self.save()?;
        }
        info!("Synced {} certificate(s) from {}", added, path.display());
        Ok(added)
    }
}
