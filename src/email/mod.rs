//! Bulk email over SMTP: one message per recipient, rate limited.
pub mod attachments;
pub mod config;
pub mod mailer;
pub mod matching;
pub mod message;
pub mod send;
pub mod template;
pub mod throttle;

use std::path::PathBuf;
use thiserror::Error;

use crate::error::{ConfigError, InputError};

pub use config::EmailConfig;
pub use mailer::{Mailer, SmtpMailer};
pub use message::OutgoingEmail;
pub use throttle::Throttle;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Invalid email address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Could not read attachment {}: {source}", .path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not build message: {0}")]
    Message(String),

    #[error("Failed to connect to SMTP server {server}: {message}")]
    Connect { server: String, message: String },

    #[error("SMTP send failed: {0}")]
    Send(String),

    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("No subject given and none set in the email config")]
    MissingSubject,
}
