//! Counter store backends.
//!
//! Provides an in-memory store by default, with optional Redis support
//! via the `redis` feature.

mod config;
mod in_memory;

#[cfg(feature = "redis")]
mod redis;

pub use config::{StoreBackend, StoreConfig};
pub use in_memory::{InMemoryCounterStore, InMemoryCounterStoreBuilder};

#[cfg(feature = "redis")]
pub use redis::RedisCounterStore;

use crate::error::{FloodgateError, Result};
use crate::traits::CounterStore;
use std::sync::Arc;

/// Build the counter store described by `config`
///
/// Fails when Redis is selected without a URL or without the `redis`
/// feature compiled in, rather than silently counting in memory.
pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn CounterStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryCounterStore::new(config.max_entries))),
        StoreBackend::Redis => build_redis_store(config),
    }
}

#[cfg(feature = "redis")]
fn build_redis_store(config: &StoreConfig) -> Result<Arc<dyn CounterStore>> {
    let url = config
        .redis_url
        .as_deref()
        .ok_or_else(|| FloodgateError::bad_request("Redis store selected but no redis_url set"))?;
    Ok(Arc::new(RedisCounterStore::new(url)?))
}

#[cfg(not(feature = "redis"))]
fn build_redis_store(_config: &StoreConfig) -> Result<Arc<dyn CounterStore>> {
    Err(FloodgateError::bad_request(
        "Redis store selected but the `redis` feature is not enabled",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_memory_store() {
        let store = build_store(&StoreConfig::default()).unwrap();
        assert!(store.is_healthy());
        assert_eq!(store.incr("k").await.unwrap(), 1);
    }

    #[test]
    fn test_redis_without_url_is_rejected() {
        let config = StoreConfig {
            backend: StoreBackend::Redis,
            redis_url: None,
            ..StoreConfig::default()
        };
        assert!(matches!(build_store(&config), Err(FloodgateError::BadRequest(_))));
    }
}
