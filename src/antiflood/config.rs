use serde::{Deserialize, Serialize};

use super::limiter::MAX_WINDOW;
use crate::error::{FloodgateError, Result};
use crate::utils::get_env_with_prefix;

/// Anti-flood configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AntiFloodConfig {
    /// Attempts allowed per bucket when the caller passes no limit
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Counter lifetime in seconds when the caller passes no window
    #[serde(default = "default_window_seconds")]
    pub default_window_seconds: u64,

    /// Prefix of the per-minute counter keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Prefix of the first-attempt timestamp keys
    #[serde(default = "default_timestamp_prefix")]
    pub timestamp_prefix: String,
}

impl Default for AntiFloodConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_window_seconds: default_window_seconds(),
            key_prefix: default_key_prefix(),
            timestamp_prefix: default_timestamp_prefix(),
        }
    }
}

impl AntiFloodConfig {
    pub fn new(default_limit: u32, default_window_seconds: u64) -> Self {
        Self {
            default_limit,
            default_window_seconds,
            ..Self::default()
        }
    }

    pub fn builder() -> AntiFloodConfigBuilder {
        AntiFloodConfigBuilder::new()
    }

    /// Load anti-flood configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(limit) = get_env_with_prefix("ANTIFLOOD_DEFAULT_LIMIT") {
            if let Ok(val) = limit.parse() {
                config.default_limit = val;
            }
        }

        if let Some(window) = get_env_with_prefix("ANTIFLOOD_DEFAULT_WINDOW_SECONDS") {
            if let Ok(val) = window.parse() {
                config.default_window_seconds = val;
            }
        }

        if let Some(prefix) = get_env_with_prefix("ANTIFLOOD_KEY_PREFIX") {
            config.key_prefix = prefix;
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_limit == 0 {
            return Err(FloodgateError::bad_request(
                "Anti-flood default_limit must be greater than 0",
            ));
        }
        if self.default_window_seconds == 0 {
            return Err(FloodgateError::bad_request(
                "Anti-flood default_window_seconds must be greater than 0",
            ));
        }
        if self.default_window_seconds > MAX_WINDOW.as_secs() {
            return Err(FloodgateError::bad_request(format!(
                "Anti-flood default_window_seconds must not exceed {}",
                MAX_WINDOW.as_secs()
            )));
        }
        if self.key_prefix.is_empty() || self.key_prefix.contains(':') {
            return Err(FloodgateError::bad_request(format!(
                "Anti-flood key_prefix must be non-empty and contain no ':', got: {:?}",
                self.key_prefix
            )));
        }
        Ok(())
    }
}

/// Builder for AntiFloodConfig
#[must_use = "builder does nothing until you call build()"]
pub struct AntiFloodConfigBuilder {
    config: AntiFloodConfig,
}

impl AntiFloodConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AntiFloodConfig::default(),
        }
    }

    pub fn default_limit(mut self, limit: u32) -> Self {
        self.config.default_limit = limit;
        self
    }

    pub fn default_window_seconds(mut self, seconds: u64) -> Self {
        self.config.default_window_seconds = seconds;
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    pub fn timestamp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.timestamp_prefix = prefix.into();
        self
    }

    pub fn build(self) -> AntiFloodConfig {
        self.config
    }
}

impl Default for AntiFloodConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_limit() -> u32 {
    10
}

fn default_window_seconds() -> u64 {
    3600 // 1 hour
}

fn default_key_prefix() -> String {
    "antiflood".to_string()
}

fn default_timestamp_prefix() -> String {
    "antiflood_timestamp".to_string()
}
