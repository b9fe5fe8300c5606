use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::config::{load_config_file, SecretOverrides};
use crate::error::ConfigError;

/// Settings for the external certificate registry (`api_config.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub api_enabled: bool,
    #[serde(default)]
    pub api_base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_expiry_years")]
    pub default_expiry_years: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_expiry_years() -> u32 {
    2
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_enabled: false,
            api_base_url: String::new(),
            api_key: String::new(),
            default_expiry_years: default_expiry_years(),
            timeout_seconds: default_timeout_seconds(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl ApiConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_config_file(path)
    }

    /// Load the file if present; a missing or broken file leaves the
    /// integration disabled unless the environment supplies URL and key.
    pub fn load_or_default(path: &Path, secrets: &SecretOverrides) -> Self {
        let config = match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => {
                warn!("Could not load API config: {}", e);
                Self::default()
            }
        };
        config.with_overrides(secrets)
    }

    pub fn with_overrides(mut self, secrets: &SecretOverrides) -> Self {
        if let Some(url) = &secrets.api_url {
            self.api_base_url = url.clone();
        }
        if let Some(key) = &secrets.api_key {
            self.api_key = key.clone();
        }
        if secrets.api_url.is_some() && secrets.api_key.is_some() {
            self.api_enabled = true;
        }
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.api_enabled && !self.api_base_url.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_defaults() {
        let config: ApiConfig = serde_json::from_str(
            r#"{"api_base_url": "https://registry.example.com/api.php", "api_key": "k"}"#,
        )
        .unwrap();
        assert!(config.is_enabled());
        assert_eq!(config.default_expiry_years, 2);
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_file_is_disabled() {
        let config = ApiConfig::load_or_default(Path::new("/no/such/api_config.json"), &SecretOverrides::default());
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_env_overrides_enable() {
        let secrets = SecretOverrides {
            api_key: Some("secret".into()),
            api_url: Some("http://localhost:9000/api.php".into()),
            smtp_password: None,
        };
        let config = ApiConfig::default().with_overrides(&secrets);
        assert!(config.is_enabled());
        assert_eq!(config.api_key, "secret");
    }
}
