use crate::error::{FloodgateError, Result};
use crate::traits::CounterStore;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Outcome of trying to take ownership of a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller owns the delivery and must mark or release it
    Claimed,
    /// A previous delivery was already handled
    Processed,
    /// Another request holds the claim right now
    InFlight,
}

/// Trait for remembering which notifications were already processed
///
/// The gateway retries deliveries, so the same `{invoice}:{status}` pair may
/// arrive several times, sometimes concurrently. `try_claim` must be atomic:
/// of several concurrent callers at most one gets [`Claim::Claimed`].
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Check if a notification has already been processed
    async fn is_processed(&self, key: &str) -> Result<bool>;

    /// Take ownership of a delivery before acting on it
    async fn try_claim(&self, key: &str) -> Result<Claim>;

    /// Give a claim back without marking, so a retry can process it
    async fn release(&self, key: &str) -> Result<()>;

    /// Mark a notification as processed and drop its claim
    async fn mark_processed(&self, key: String) -> Result<()>;
}

#[derive(Default)]
struct MemoryState {
    processed: HashSet<String>,
    in_flight: HashSet<String>,
}

/// In-memory idempotency store (for development/testing)
///
/// Entries never expire and are not shared between instances.
#[derive(Default)]
pub struct MemoryIdempotencyStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for MemoryIdempotencyStore {
    async fn is_processed(&self, key: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.processed.contains(key))
    }

    async fn try_claim(&self, key: &str) -> Result<Claim> {
        let mut state = self.state.write().await;
        if state.processed.contains(key) {
            return Ok(Claim::Processed);
        }
        if !state.in_flight.insert(key.to_string()) {
            return Ok(Claim::InFlight);
        }
        Ok(Claim::Claimed)
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.in_flight.remove(key);
        Ok(())
    }

    async fn mark_processed(&self, key: String) -> Result<()> {
        let mut state = self.state.write().await;
        state.in_flight.remove(&key);
        state.processed.insert(key);
        Ok(())
    }
}

/// Idempotency store backed by the shared counter store
///
/// Marks live for `retention` and then expire, so the set of remembered
/// deliveries stays bounded. With the Redis backend every instance sees the
/// same marks.
///
/// Claims are an `INCR` on a separate `{prefix}:{key}:claim` counter: only
/// the caller that sees 1 owns the delivery. A claim expires after
/// `claim_ttl` so a crashed instance cannot block retries forever.
pub struct CounterIdempotencyStore<S: CounterStore> {
    store: S,
    prefix: String,
    retention: Duration,
    claim_ttl: Duration,
}

impl<S: CounterStore> CounterIdempotencyStore<S> {
    /// Default time a processed delivery is remembered
    pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    /// Default lifetime of an unreleased claim
    pub const DEFAULT_CLAIM_TTL: Duration = Duration::from_secs(5 * 60);

    pub fn new(store: S) -> Self {
        Self {
            store,
            prefix: "pay2_processed".to_string(),
            retention: Self::DEFAULT_RETENTION,
            claim_ttl: Self::DEFAULT_CLAIM_TTL,
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    #[must_use]
    pub fn with_claim_ttl(mut self, claim_ttl: Duration) -> Self {
        self.claim_ttl = claim_ttl;
        self
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn claim_key(&self, key: &str) -> String {
        format!("{}:{}:claim", self.prefix, key)
    }
}

#[async_trait]
impl<S: CounterStore> IdempotencyStore for CounterIdempotencyStore<S> {
    async fn is_processed(&self, key: &str) -> Result<bool> {
        Ok(self.store.get(&self.key(key)).await?.is_some())
    }

    async fn try_claim(&self, key: &str) -> Result<Claim> {
        if self.is_processed(key).await? {
            return Ok(Claim::Processed);
        }

        let claim_key = self.claim_key(key);
        if self.store.incr(&claim_key).await? != 1 {
            return Ok(Claim::InFlight);
        }
        if let Err(e) = self.store.expire(&claim_key, self.claim_ttl).await {
            let _ = self.store.delete(&claim_key).await;
            return Err(e);
        }

        // The previous owner marks before it drops its claim, so a claim
        // taken after that drop must see the mark here.
        if self.is_processed(key).await? {
            self.store.delete(&claim_key).await?;
            return Ok(Claim::Processed);
        }
        Ok(Claim::Claimed)
    }

    async fn release(&self, key: &str) -> Result<()> {
        self.store.delete(&self.claim_key(key)).await?;
        Ok(())
    }

    async fn mark_processed(&self, key: String) -> Result<()> {
        self.store.set_ex(&self.key(&key), 1, self.retention).await?;
        if let Err(e) = self.store.delete(&self.claim_key(&key)).await {
            // The mark is in place; the claim runs out on its own
            tracing::warn!(key = %key, error = %e, "Failed to drop Pay2 idempotency claim");
        }
        Ok(())
    }
}

/// Error returned while another request is handling the same delivery
pub(crate) fn in_flight_error() -> FloodgateError {
    FloodgateError::service_unavailable("Pay2 notification is already being processed")
}
