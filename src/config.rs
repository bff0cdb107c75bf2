//! Core configuration.
//!
//! Loaded from an optional JSON file (default `~/.sqlbridge/config.json`),
//! then overridden by environment variables:
//!
//! - `SQLBRIDGE_DRIVER_DIR`: `drivers.storage_dir`
//! - `SQLBRIDGE_REPOSITORY_URL`: `drivers.repository_url`
//! - `SQLBRIDGE_LOG`: `logging.level`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::services::drivers::{DEFAULT_REPOSITORY_URL, HttpSettings};

pub const ENV_DRIVER_DIR: &str = "SQLBRIDGE_DRIVER_DIR";
pub const ENV_REPOSITORY_URL: &str = "SQLBRIDGE_REPOSITORY_URL";
pub const ENV_LOG: &str = "SQLBRIDGE_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CoreConfig {
    pub drivers: DriversConfig,
    pub logging: LoggingConfig,
}

/// Driver acquisition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriversConfig {
    /// Root of the driver cache, one subdirectory per dialect
    pub storage_dir: PathBuf,
    pub repository_url: String,
    pub connect_timeout_secs: u64,
    /// Whole-request timeout, body included
    pub read_timeout_secs: u64,
    pub user_agent: String,
    /// Download the default driver before a dialect's first connection
    pub auto_install: bool,
}

impl Default for DriversConfig {
    fn default() -> Self {
        let http = HttpSettings::default();
        Self {
            storage_dir: app_dir().join("drivers"),
            repository_url: DEFAULT_REPOSITORY_URL.to_string(),
            connect_timeout_secs: http.connect_timeout.as_secs(),
            read_timeout_secs: http.read_timeout.as_secs(),
            user_agent: http.user_agent,
            auto_install: true,
        }
    }
}

impl DriversConfig {
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `~/.sqlbridge`, or `./.sqlbridge` without a home directory.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sqlbridge")
}

pub fn default_config_path() -> PathBuf {
    app_dir().join("config.json")
}

impl CoreConfig {
    /// Load the config file if it exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);

        let mut config = if path.is_file() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_DRIVER_DIR).filter(|v| !v.is_empty()) {
            self.drivers.storage_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup(ENV_REPOSITORY_URL).filter(|v| !v.is_empty()) {
            self.drivers.repository_url = url;
        }
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.drivers.repository_url).map_err(|e| {
            Error::InvalidConfig(format!(
                "invalid repository url '{}': {}",
                self.drivers.repository_url, e
            ))
        })?;
        if self.drivers.connect_timeout_secs == 0 || self.drivers.read_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "driver timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
