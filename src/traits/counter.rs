//! Counter store trait for expiring integer keys
//!
//! This trait abstracts the key-value backend behind the anti-flood
//! limiter, allowing users to swap between in-memory, Redis, or custom
//! implementations.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value store holding integer counters with optional TTL
///
/// The command set mirrors what Redis offers (`INCR`, `EXPIRE`, `GET`,
/// `SETEX`, `DEL`) so any Redis-compatible server maps onto it directly.
///
/// Implementations must report backend failures as errors. Returning a
/// default value on failure would turn an outage into "allowed".
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter at `key` and return the new value
    ///
    /// A missing key starts at `0`, so the first call returns `1`.
    /// Incrementing must not change the TTL of an existing key.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Set the time-to-live of an existing key
    ///
    /// Returns `Ok(false)` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Read the counter at `key`
    ///
    /// Returns `Ok(None)` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> Result<Option<i64>>;

    /// Overwrite `key` with `value`, expiring after `ttl`
    async fn set_ex(&self, key: &str, value: i64, ttl: Duration) -> Result<()>;

    /// Remove `key`, returning whether anything was removed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Check if the store backend is reachable
    fn is_healthy(&self) -> bool;
}

#[async_trait]
impl<T: CounterStore + ?Sized> CounterStore for std::sync::Arc<T> {
    async fn incr(&self, key: &str) -> Result<i64> {
        (**self).incr(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        (**self).expire(key, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<i64>> {
        (**self).get(key).await
    }

    async fn set_ex(&self, key: &str, value: i64, ttl: Duration) -> Result<()> {
        (**self).set_ex(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key).await
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }
}
