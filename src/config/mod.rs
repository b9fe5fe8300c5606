use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub throttle: ThrottleOverrides,
    pub secrets: SecretOverrides,
}

/// Default locations of the data files each automation reads and writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub certificates_dir: PathBuf,
    pub emails_dir: PathBuf,
    pub outlook_dir: PathBuf,
    pub phone_numbers_dir: PathBuf,
}

/// Environment overrides for the email send rate. `None` keeps the value
/// from the email config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThrottleOverrides {
    pub delay_ms: Option<u64>,
    pub batch_size: Option<usize>,
    pub batch_pause_secs: Option<u64>,
}

/// Credentials that may be kept out of the JSON config files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretOverrides {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub smtp_password: Option<String>,
}

impl PathsConfig {
    pub fn under(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            certificates_dir: data_dir.join("certificates"),
            emails_dir: data_dir.join("emails"),
            outlook_dir: data_dir.join("outlook"),
            phone_numbers_dir: data_dir.join("phone_numbers"),
            data_dir,
        }
    }

    pub fn api_config_file(&self) -> PathBuf {
        self.emails_dir.join("api_config.json")
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.emails_dir.join("attachments")
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = env::var("CERTKIT_DATA_DIR").unwrap_or_else(|_| "data".to_string());

        Self {
            paths: PathsConfig::under(data_dir),
            throttle: ThrottleOverrides::default(),
            secrets: SecretOverrides::default(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Throttle overrides
        if let Ok(v) = env::var("CERTKIT_EMAIL_DELAY_MS") {
            self.throttle.delay_ms = v.parse().ok();
        }
        if let Ok(v) = env::var("CERTKIT_EMAIL_BATCH_SIZE") {
            self.throttle.batch_size = v.parse().ok();
        }
        if let Ok(v) = env::var("CERTKIT_EMAIL_BATCH_PAUSE_SECS") {
            self.throttle.batch_pause_secs = v.parse().ok();
        }

        // Secret overrides
        if let Ok(v) = env::var("CERTKIT_API_KEY") {
            self.secrets.api_key = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("CERTKIT_API_URL") {
            self.secrets.api_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("CERTKIT_SMTP_PASSWORD") {
            self.secrets.smtp_password = Some(v).filter(|s| !s.is_empty());
        }

        self
    }

    /// Re-root every default path under another data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.paths = PathsConfig::under(data_dir);
        self
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// Load a JSON config file, or YAML when the extension says so
pub fn load_config_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    } else {
        serde_json::from_str(&content).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
