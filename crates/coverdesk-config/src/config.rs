//! Daemon configuration.

use crate::{ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default backend base URL (overridable at compile time).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("COVERDESK_API_BASE_URL") {
    Some(url) => url,
    None => "https://api.coverdesk.app",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 5;
const DEFAULT_MAX_SEND_RETRIES: i64 = 8;

/// Main daemon configuration, loaded from `config.json` under the base
/// dir with `COVERDESK_*` environment overrides on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Seconds between sync passes.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Delivery attempts before an item is left for manual attention.
    #[serde(default = "default_max_send_retries")]
    pub max_send_retries: i64,
    /// Emit JSON log lines instead of the human format.
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_sync_interval_secs() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

fn default_max_send_retries() -> i64 {
    DEFAULT_MAX_SEND_RETRIES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            max_send_retries: DEFAULT_MAX_SEND_RETRIES,
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
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

    /// Override fields from `COVERDESK_*` environment variables.
    fn load_from_env(&mut self) {
        if let Ok(level) = std::env::var("COVERDESK_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(url) = std::env::var("COVERDESK_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(secs) = std::env::var("COVERDESK_SYNC_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                self.sync_interval_secs = secs;
            }
        }
    }

    /// Parse the backend base URL, rejecting malformed values early.
    pub fn api_base_url(&self) -> ConfigResult<Url> {
        Ok(Url::parse(&self.api_base_url)?)
    }
}
