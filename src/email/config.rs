use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::throttle::Throttle;
use crate::config::{load_config_file, SecretOverrides, ThrottleOverrides};
use crate::error::ConfigError;

/// SMTP account and send-rate settings (`email_config.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    /// Account address; also the `From` address
    #[serde(alias = "sender_email")]
    pub email: String,
    /// App password issued by the provider
    pub password: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_pause_secs")]
    pub batch_pause_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    50
}

fn default_batch_pause_secs() -> u64 {
    30
}

/// How the connection to the SMTP server is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS from the first byte (port 465)
    Implicit,
    StartTls,
    None,
}

impl EmailConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_config_file(path)
    }

    pub fn with_overrides(mut self, throttle: &ThrottleOverrides, secrets: &SecretOverrides) -> Self {
        if let Some(delay) = throttle.delay_ms {
            self.delay_ms = delay;
        }
        if let Some(size) = throttle.batch_size {
            self.batch_size = size;
        }
        if let Some(pause) = throttle.batch_pause_secs {
            self.batch_pause_secs = pause;
        }
        if let Some(password) = &secrets.smtp_password {
            self.password = password.clone();
        }
        self
    }

    pub fn tls_mode(&self) -> TlsMode {
        if self.smtp_port == 465 {
            TlsMode::Implicit
        } else if self.use_tls {
            TlsMode::StartTls
        } else {
            TlsMode::None
        }
    }

    pub fn throttle(&self) -> Throttle {
        Throttle::new(
            Duration::from_millis(self.delay_ms),
            self.batch_size,
            Duration::from_secs(self.batch_pause_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTLOOK: &str = r#"{
        "smtp_server": "smtp-mail.outlook.com",
        "smtp_port": 587,
        "sender_email": "certs@example.com",
        "password": "app-password",
        "subject": "Your certificate"
    }"#;

    #[test]
    fn test_sender_email_alias_and_defaults() {
        let config: EmailConfig = serde_json::from_str(OUTLOOK).unwrap();
        assert_eq!(config.email, "certs@example.com");
        assert_eq!(config.subject.as_deref(), Some("Your certificate"));
        assert!(config.use_tls);
        assert_eq!(config.delay_ms, 1000);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.batch_pause_secs, 30);
        assert_eq!(config.tls_mode(), TlsMode::StartTls);
    }

    #[test]
    fn test_tls_modes() {
        let mut config: EmailConfig = serde_json::from_str(OUTLOOK).unwrap();
        config.smtp_port = 465;
        assert_eq!(config.tls_mode(), TlsMode::Implicit);

        config.smtp_port = 25;
        config.use_tls = false;
        assert_eq!(config.tls_mode(), TlsMode::None);
    }

    #[test]
    fn test_overrides() {
        let config: EmailConfig = serde_json::from_str(OUTLOOK).unwrap();
        let throttle = ThrottleOverrides { delay_ms: Some(0), batch_size: None, batch_pause_secs: Some(5) };
        let secrets = SecretOverrides { smtp_password: Some("from-env".into()), ..Default::default() };

        let config = config.with_overrides(&throttle, &secrets);
        assert_eq!(config.delay_ms, 0);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.batch_pause_secs, 5);
        assert_eq!(config.password, "from-env");
    }
}
