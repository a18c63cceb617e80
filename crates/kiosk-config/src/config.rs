//! Configuration for the kiosk clients.

use crate::{ConfigError, ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default API base URL (can be overridden at compile time via FLAVORMIX_API_URL env var).
pub const DEFAULT_API_URL: &str = match option_env!("FLAVORMIX_API_URL") {
    Some(url) => url,
    None => "https://api.flavormix.io",
};

/// Path of the submit-combination endpoint under the API base.
pub const SUBMIT_COMBINATION_PATH: &str = "/combinations";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default delay before retrying a failed delivery, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 3000;

/// Main kiosk client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Flavors API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Fixed delay before retrying a failed delivery, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    /// Note: api_url defaults are compile-time only (FLAVORMIX_API_URL at
    /// build time); at runtime only log_level can be overridden here.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("FLAVORMIX_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Get the API base URL as a parsed URL.
    pub fn api_url(&self) -> ConfigResult<Url> {
        Url::parse(&self.api_url).map_err(ConfigError::from)
    }

    /// Full URL of the submit-combination endpoint.
    pub fn submit_url(&self) -> String {
        format!(
            "{}{}",
            self.api_url.trim_end_matches('/'),
            SUBMIT_COMBINATION_PATH
        )
    }
}
