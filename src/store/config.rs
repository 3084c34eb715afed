use serde::{Deserialize, Serialize};

use crate::utils::get_env_with_prefix;

/// Counter store backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process moka store (default)
    #[default]
    Memory,
    /// Redis store (requires the `redis` feature)
    Redis,
}

/// Counter store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Redis connection URL (only used for the Redis backend)
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Maximum number of counters for the in-memory store
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: None,
            max_entries: default_max_entries(),
        }
    }
}

impl StoreConfig {
    /// Load store configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(backend) = get_env_with_prefix("STORE_BACKEND") {
            config.backend = match backend.to_lowercase().as_str() {
                "redis" => StoreBackend::Redis,
                "memory" | "in_memory" | "inmemory" => StoreBackend::Memory,
                other => {
                    tracing::warn!(backend = other, "Unknown store backend, using in-memory");
                    StoreBackend::Memory
                }
            };
        }

        if let Some(url) = get_env_with_prefix("STORE_REDIS_URL") {
            config.redis_url = Some(url);
        }

        if let Some(max) = get_env_with_prefix("STORE_MAX_ENTRIES") {
            if let Ok(entries) = max.parse() {
                config.max_entries = entries;
            }
        }

        config
    }
}

fn default_max_entries() -> u64 {
    100_000
}
