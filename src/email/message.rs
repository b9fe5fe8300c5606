use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::{Address, Message};
use std::fs;
use std::path::{Path, PathBuf};

use super::EmailError;

/// One message ready to go out: plain-text body plus file attachments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self { to: to.into(), subject: subject.into(), body: body.into(), attachments: Vec::new() }
    }

    pub fn with_attachments(mut self, attachments: Vec<PathBuf>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn to_message(&self, from: &Mailbox) -> Result<Message, EmailError> {
        let builder = Message::builder()
            .from(from.clone())
            .to(Mailbox::new(None, parse_address(&self.to)?))
            .subject(self.subject.clone());

        let message = if self.attachments.is_empty() {
            builder.header(ContentType::TEXT_PLAIN).body(self.body.clone())
        } else {
            let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(self.body.clone()));
            for path in &self.attachments {
                parts = parts.singlepart(attachment(path)?);
            }
            builder.multipart(parts)
        };

        message.map_err(|e| EmailError::Message(e.to_string()))
    }
}

pub fn parse_address(address: &str) -> Result<Address, EmailError> {
    address.trim().parse().map_err(|source| EmailError::InvalidAddress {
        address: address.to_string(),
        source,
    })
}

pub fn sender_mailbox(email: &str, sender_name: Option<&str>) -> Result<Mailbox, EmailError> {
    Ok(Mailbox::new(sender_name.map(str::to_string), parse_address(email)?))
}

fn attachment(path: &Path) -> Result<SinglePart, EmailError> {
    let content = fs::read(path).map_err(|source| EmailError::Attachment {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());

    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
        _ => "application/octet-stream",
    };
    let content_type = ContentType::parse(mime).map_err(|e| EmailError::Message(e.to_string()))?;

    Ok(Attachment::new(filename).body(content, content_type))
}
