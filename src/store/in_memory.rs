//! In-memory counter store backed by moka
//!
//! Uses moka's per-key compute operations so increments are atomic even
//! under concurrent access, and a custom expiry policy so each counter
//! carries its own deadline.

use crate::error::{FloodgateError, Result};
use crate::traits::counter::CounterStore;
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use moka::ops::compute::{CompResult, Op};
use std::future::ready;
use std::time::{Duration, Instant};

/// Counter value plus its absolute deadline
#[derive(Clone, Debug)]
struct CounterEntry {
    value: i64,
    /// `None` means the key never expires (Redis semantics for a fresh INCR)
    expires_at: Option<Instant>,
}

/// Expiry policy that follows each entry's own deadline
///
/// Increments keep the deadline they found, so a counter behaves like a
/// Redis key whose TTL is only changed by EXPIRE/SETEX.
struct DeadlineExpiry;

impl Expiry<String, CounterEntry> for DeadlineExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CounterEntry,
        created_at: Instant,
    ) -> Option<Duration> {
        value
            .expires_at
            .map(|deadline| deadline.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CounterEntry,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value
            .expires_at
            .map(|deadline| deadline.saturating_duration_since(updated_at))
    }
}

/// In-memory counter store
///
/// Suitable for tests, development, and single-instance deployments. Counters
/// are not shared between processes; use the Redis store when several
/// instances must agree on a limit.
///
/// # Example
///
/// ```rust,ignore
/// use floodgate::store::InMemoryCounterStore;
/// use floodgate::traits::CounterStore;
///
/// let store = InMemoryCounterStore::new(10_000);
/// assert_eq!(store.incr("antiflood:42:login:202501011200").await?, 1);
/// ```
#[derive(Clone)]
pub struct InMemoryCounterStore {
    inner: MokaCache<String, CounterEntry>,
}

impl InMemoryCounterStore {
    /// Create a store bounded to `max_entries` counters
    pub fn new(max_entries: u64) -> Self {
        Self::builder().max_entries(max_entries).build()
    }

    pub fn builder() -> InMemoryCounterStoreBuilder {
        InMemoryCounterStoreBuilder::new()
    }

    /// Run pending maintenance tasks (eviction, expiration)
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Get the current number of live counters
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

/// Builder for InMemoryCounterStore
pub struct InMemoryCounterStoreBuilder {
    max_entries: u64,
}

impl InMemoryCounterStoreBuilder {
    pub fn new() -> Self {
        Self {
            max_entries: 10_000,
        }
    }

    /// Set maximum number of counters kept in memory
    pub fn max_entries(mut self, max: u64) -> Self {
        self.max_entries = max;
        self
    }

    pub fn build(self) -> InMemoryCounterStore {
        let cache = MokaCache::builder()
            .max_capacity(self.max_entries)
            .expire_after(DeadlineExpiry)
            .build();

        InMemoryCounterStore { inner: cache }
    }
}

impl Default for InMemoryCounterStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn incr(&self, key: &str) -> Result<i64> {
        let entry = self
            .inner
            .entry(key.to_string())
            .and_upsert_with(|existing| {
                let next = match existing {
                    Some(entry) => {
                        let current = entry.into_value();
                        CounterEntry {
                            value: current.value.saturating_add(1),
                            expires_at: current.expires_at,
                        }
                    }
                    None => CounterEntry {
                        value: 1,
                        expires_at: None,
                    },
                };
                ready(next)
            })
            .await;

        Ok(entry.into_value().value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let deadline = deadline_after(ttl)?;
        let result = self
            .inner
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(entry) => {
                        let mut counter = entry.into_value();
                        counter.expires_at = Some(deadline);
                        Op::Put(counter)
                    }
                    None => Op::Nop,
                };
                ready(op)
            })
            .await;

        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn get(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.inner.get(key).await.map(|entry| entry.value))
    }

    async fn set_ex(&self, key: &str, value: i64, ttl: Duration) -> Result<()> {
        let entry = CounterEntry {
            value,
            expires_at: Some(deadline_after(ttl)?),
        };
        self.inner.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.inner.remove(key).await.is_some())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

fn deadline_after(ttl: Duration) -> Result<Instant> {
    Instant::now()
        .checked_add(ttl)
        .ok_or_else(|| FloodgateError::store(format!("TTL of {}s is out of range", ttl.as_secs())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_incr_starts_at_one() {
        let store = InMemoryCounterStore::new(100);
        assert_eq!(store.incr("k").await.unwrap(), 1);
        assert_eq!(store.incr("k").await.unwrap(), 2);
        assert_eq!(store.incr("k").await.unwrap(), 3);
        assert_eq!(store.get("k").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = InMemoryCounterStore::new(100);
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expire_missing_key_returns_false() {
        let store = InMemoryCounterStore::new(100);
        assert!(!store.expire("missing", Duration::from_secs(10)).await.unwrap());
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expire_drops_counter_after_ttl() {
        let store = InMemoryCounterStore::new(100);
        store.incr("k").await.unwrap();
        assert!(store.expire("k", Duration::from_millis(20)).await.unwrap());

        tokio::time::sleep(Duration::from_millis(60)).await;
        store.run_pending_tasks().await;

        assert_eq!(store.get("k").await.unwrap(), None);
        // Starts over like a fresh Redis key
        assert_eq!(store.incr("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_keeps_existing_ttl() {
        let store = InMemoryCounterStore::new(100);
        store.incr("k").await.unwrap();
        store.expire("k", Duration::from_millis(40)).await.unwrap();

        // Later increments must not push the deadline out
        store.incr("k").await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        store.incr("k").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        store.run_pending_tasks().await;

        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_ex_overwrites() {
        let store = InMemoryCounterStore::new(100);
        store.incr("ts").await.unwrap();
        store
            .set_ex("ts", 1_700_000_000, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("ts").await.unwrap(), Some(1_700_000_000));
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_is_an_error() {
        let store = InMemoryCounterStore::new(100);
        store.incr("k").await.unwrap();

        let err = store.expire("k", Duration::MAX).await.unwrap_err();
        assert!(matches!(err, FloodgateError::Store(_)));
        let err = store.set_ex("ts", 1, Duration::MAX).await.unwrap_err();
        assert!(matches!(err, FloodgateError::Store(_)));

        // The counter is untouched and the timestamp was never written
        assert_eq!(store.get("k").await.unwrap(), Some(1));
        assert_eq!(store.get("ts").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryCounterStore::new(100);
        store.incr("k").await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryCounterStore::new(1000));

        let mut handles = vec![];
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    store.incr("shared").await.unwrap();
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get("shared").await.unwrap(), Some(500));
    }
}
