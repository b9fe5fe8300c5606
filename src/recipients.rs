//! Recipient list parsing.
//!
//! All three list shapes are comma separated, skip blank lines and lines
//! whose first field starts with `#`, and skip (with a warning) rows that
//! are not valid UTF-8 or do not carry enough columns.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::InputError;

/// `Name,Course` row for the certificate filler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecipient {
    pub name: String,
    pub course: String,
}

/// `name,email` row for personalized mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRecipient {
    pub name: String,
    pub email: String,
}

/// `name,email,file` row for mail with a per-recipient attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecipient {
    pub name: String,
    pub email: String,
    pub file: String,
}

fn read_rows(path: &Path, has_headers: bool) -> Result<Vec<(u64, StringRecord)>, InputError> {
    let file = std::fs::File::open(path).map_err(|e| InputError::read(path, e))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        let raw = result.map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = raw.position().map(|p| p.line()).unwrap_or(0);

        let record = match StringRecord::from_byte_record(raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping line {} in {}: {}", line, path.display(), e);
                continue;
            }
        };
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        if record.get(0).is_some_and(|first| first.trim_start().starts_with('#')) {
            continue;
        }
        rows.push((line, record));
    }
    Ok(rows)
}

pub fn read_certificate_recipients(path: &Path) -> Result<Vec<CertificateRecipient>, InputError> {
    let mut recipients = Vec::new();
    for (line, row) in read_rows(path, false)? {
        match (row.get(0), row.get(1)) {
            (Some(name), Some(course)) if !name.is_empty() => recipients.push(CertificateRecipient {
                name: name.to_string(),
                course: course.to_string(),
            }),
            _ => warn!(
                "Invalid format on line {} in {}. Expected format: Name,Course",
                line,
                path.display()
            ),
        }
    }
    Ok(recipients)
}

/// Reads a `name,email` list. The first row is a header. A row holding only
/// an address uses the address's local part as the name.
pub fn read_mail_recipients(path: &Path) -> Result<Vec<MailRecipient>, InputError> {
    let mut recipients = Vec::new();
    for (line, row) in read_rows(path, true)? {
        let name = row.get(0).unwrap_or_default();
        let email = row.get(1).unwrap_or_default();

        if !name.is_empty() && !email.is_empty() {
            recipients.push(MailRecipient {
                name: name.to_string(),
                email: email.to_string(),
            });
        } else if row.len() == 1 && name.contains('@') {
            let local = name.split('@').next().unwrap_or(name);
            recipients.push(MailRecipient {
                name: local.to_string(),
                email: name.to_string(),
            });
        } else {
            warn!("Skipping line {} in {}: expected name,email", line, path.display());
        }
    }
    Ok(recipients)
}

pub fn read_attachment_recipients(path: &Path) -> Result<Vec<AttachmentRecipient>, InputError> {
    let mut recipients = Vec::new();
    for (line, row) in read_rows(path, false)? {
        match (row.get(0), row.get(1), row.get(2)) {
            (Some(name), Some(email), Some(file)) => recipients.push(AttachmentRecipient {
                name: name.to_string(),
                email: email.to_string(),
                file: file.to_string(),
            }),
            _ => warn!(
                "Invalid format on line {} in {}. Expected format: name,email,file",
                line,
                path.display()
            ),
        }
    }
    Ok(recipients)
}
