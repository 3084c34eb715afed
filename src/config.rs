use serde::{Deserialize, Serialize};

use crate::antiflood::AntiFloodConfig;
use crate::error::{FloodgateError, Result};
use crate::store::{StoreBackend, StoreConfig};
use crate::utils::{get_env_with_prefix, parse_flag};
use crate::webhooks::Pay2Config;

/// Main configuration for floodgate
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub antiflood: AntiFloodConfig,
    #[serde(default)]
    pub pay2: Pay2Config,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_antiflood(mut self, antiflood: AntiFloodConfig) -> Self {
        self.config.antiflood = antiflood;
        self
    }

    pub fn with_pay2(mut self, pay2: Pay2Config) -> Self {
        self.config.pay2 = pay2;
        self
    }

    pub fn with_pay2_test_mode(mut self, enabled: bool) -> Self {
        self.config.pay2.test_mode = enabled;
        self
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.config.store = store;
        self
    }

    pub fn with_redis_store(mut self, url: impl Into<String>) -> Self {
        self.config.store.backend = StoreBackend::Redis;
        self.config.store.redis_url = Some(url.into());
        self
    }

    /// Load configuration from environment variables with FLOODGATE_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = parse_flag(&json).unwrap_or(false);
        }

        self.config.antiflood = AntiFloodConfig::from_env();
        self.config.pay2 = Pay2Config::from_env();
        self.config.store = StoreConfig::from_env();

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration is invalid:
    /// - Invalid log level
    /// - Zero anti-flood limit or window, or a bad key prefix
    /// - Redis backend without a URL
    /// - Live Pay2 mode without an API key
    pub fn build(self) -> Result<Config> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(FloodgateError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        self.config.antiflood.validate()?;

        if self.config.store.backend == StoreBackend::Redis && self.config.store.redis_url.is_none() {
            return Err(FloodgateError::bad_request(
                "Redis store selected but no redis_url set",
            ));
        }

        if self.config.store.max_entries == 0 {
            return Err(FloodgateError::bad_request(
                "Store max_entries must be greater than 0",
            ));
        }

        if !self.config.pay2.test_mode && self.config.pay2.api_key.is_none() {
            tracing::warn!("No Pay2 API key configured; webhook verification is unavailable");
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.antiflood.default_limit, 10);
        assert_eq!(config.antiflood.default_window_seconds, 3600);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(!config.pay2.test_mode);
    }

    #[test]
    fn test_invalid_log_level() {
        let result = ConfigBuilder::new().with_log_level("loud").build();
        assert!(matches!(result, Err(FloodgateError::BadRequest(_))));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let result = ConfigBuilder::new()
            .with_antiflood(AntiFloodConfig::new(0, 60))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_redis_requires_url() {
        let store = StoreConfig {
            backend: StoreBackend::Redis,
            ..Default::default()
        };
        assert!(ConfigBuilder::new().with_store(store).build().is_err());

        let config = ConfigBuilder::new()
            .with_redis_store("redis://127.0.0.1:6379")
            .build()
            .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Redis);
    }

    #[test]
    fn test_from_env() {
        // SAFETY: test-only, keys are unique to this test
        unsafe {
            std::env::set_var("FLOODGATE_ANTIFLOOD_DEFAULT_LIMIT", "5");
            std::env::set_var("FLOODGATE_PAY2_TEST_MODE", "true");
        }

        let config = ConfigBuilder::new().from_env().build().unwrap();
        assert_eq!(config.antiflood.default_limit, 5);
        assert!(config.pay2.test_mode);

        unsafe {
            std::env::remove_var("FLOODGATE_ANTIFLOOD_DEFAULT_LIMIT");
            std::env::remove_var("FLOODGATE_PAY2_TEST_MODE");
        }
    }
}
