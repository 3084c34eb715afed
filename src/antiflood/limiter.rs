//! Fixed-window attempt counting.
//!
//! # Tracing Events
//!
//! - `antiflood.limited` - an attempt was refused by [`AntiFlood::guard`]

use super::actor::Actor;
use super::clock::{Clock, SystemClock};
use super::config::AntiFloodConfig;
use crate::error::{FloodgateError, Result};
use crate::traits::CounterStore;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Action name used when the caller does not give one
pub const DEFAULT_ACTION: &str = "default";

/// Longest accepted window: 30 days
pub const MAX_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Bucket granularity: one minute, formatted `YYYYMMDDHHmm`
const BUCKET_FORMAT: &str = "%Y%m%d%H%M";

/// Outcome of a single counted attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// Counter value after this attempt
    pub count: i64,
    /// Limit the attempt was checked against
    pub limit: u32,
    pub allowed: bool,
}

/// Anti-flood limiter
///
/// Counts attempts per `(actor, action)` in one-minute buckets kept in a
/// [`CounterStore`]. The first attempt in a bucket sets the key's TTL to the
/// window; later attempts only increment.
///
/// Bucket keys are truncated to the minute, so bursts straddling a bucket
/// boundary can reach roughly twice the nominal limit.
///
/// # Example
///
/// ```rust,ignore
/// use floodgate::antiflood::{Actor, AntiFlood, AntiFloodConfig};
/// use floodgate::store::InMemoryCounterStore;
///
/// let limiter = AntiFlood::new(InMemoryCounterStore::default(), AntiFloodConfig::default());
/// let actor = Actor::user("42");
///
/// if !limiter.check(&actor, "website-download", Some(2), None).await? {
///     // refuse
/// }
/// ```
#[derive(Clone)]
pub struct AntiFlood<S: CounterStore> {
    store: S,
    config: AntiFloodConfig,
    clock: Arc<dyn Clock>,
}

impl<S: CounterStore> AntiFlood<S> {
    pub fn new(store: S, config: AntiFloodConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock used to pick buckets
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &AntiFloodConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Count an attempt and report whether it is within `limit`
    ///
    /// The attempt is counted even when the answer is `false`.
    pub async fn check(
        &self,
        actor: &Actor,
        action: &str,
        limit: Option<u32>,
        window: Option<Duration>,
    ) -> Result<bool> {
        Ok(self.hit(actor, action, limit, window).await?.allowed)
    }

    /// Count an attempt and return the post-increment counter
    pub async fn hit(
        &self,
        actor: &Actor,
        action: &str,
        limit: Option<u32>,
        window: Option<Duration>,
    ) -> Result<Attempt> {
        let limit = self.resolve_limit(limit)?;
        let window = self.resolve_window(window)?;
        let now = self.clock.now();
        let key = self.bucket_key(actor, action, now)?;

        let count = self.store.incr(&key).await?;

        // Two callers racing on a fresh bucket may both see 1; setting the
        // same TTL twice is harmless.
        if count == 1 {
            if let Err(e) = self.store.expire(&key, window).await {
                self.discard_untimed(&key).await;
                return Err(e);
            }
            let timestamp_key = self.timestamp_key(actor, action);
            self.store
                .set_ex(&timestamp_key, now.timestamp(), window)
                .await?;
        }

        let allowed = count <= i64::from(limit);
        tracing::trace!(
            actor = %actor,
            action = action_or_default(action),
            count,
            limit,
            allowed,
            "Anti-flood attempt counted"
        );

        Ok(Attempt {
            count,
            limit,
            allowed,
        })
    }

    /// Count an attempt, turning a refusal into `TooManyRequests`
    pub async fn guard(
        &self,
        actor: &Actor,
        action: &str,
        limit: Option<u32>,
        window: Option<Duration>,
    ) -> Result<()> {
        let attempt = self.hit(actor, action, limit, window).await?;
        if attempt.allowed {
            return Ok(());
        }

        tracing::warn!(
            target: "antiflood.limited",
            actor = %actor,
            action = action_or_default(action),
            count = attempt.count,
            limit = attempt.limit,
            "Anti-flood limit reached"
        );
        Err(FloodgateError::too_many_requests(format!(
            "Too many attempts for '{}'. Please try again later.",
            action_or_default(action)
        )))
    }

    /// Check on behalf of a request, counting against the user if known
    pub async fn is_allowed(
        &self,
        user_id: Option<&str>,
        ip: IpAddr,
        action: &str,
        limit: Option<u32>,
        window: Option<Duration>,
    ) -> Result<bool> {
        let actor = Actor::resolve(user_id, ip);
        self.check(&actor, action, limit, window).await
    }

    /// Current counter for the present bucket, `None` if nothing was counted
    pub async fn get_record(&self, actor: &Actor, action: &str) -> Result<Option<i64>> {
        let key = self.bucket_key(actor, action, self.clock.now())?;
        self.store.get(&key).await
    }

    /// Remove the present bucket's counter
    pub async fn delete_record(&self, actor: &Actor, action: &str) -> Result<bool> {
        let key = self.bucket_key(actor, action, self.clock.now())?;
        self.store.delete(&key).await
    }

    /// Attempts left in the present bucket, never below zero
    pub async fn remaining_attempts(
        &self,
        actor: &Actor,
        action: &str,
        limit: Option<u32>,
    ) -> Result<u32> {
        let limit = self.resolve_limit(limit)?;
        let used = self.get_record(actor, action).await?.unwrap_or(0);
        let remaining = i64::from(limit).saturating_sub(used).max(0);
        Ok(u32::try_from(remaining).unwrap_or(u32::MAX))
    }

    /// Unix timestamp of the attempt that opened the current window
    pub async fn get_timestamp(&self, actor: &Actor, action: &str) -> Result<Option<i64>> {
        ensure_actor(actor)?;
        self.store.get(&self.timestamp_key(actor, action)).await
    }

    /// Storage key of the bucket `at` falls into
    pub fn bucket_key(&self, actor: &Actor, action: &str, at: DateTime<Utc>) -> Result<String> {
        ensure_actor(actor)?;
        Ok(format!(
            "{}:{}:{}:{}",
            self.config.key_prefix,
            actor,
            action_or_default(action),
            at.format(BUCKET_FORMAT)
        ))
    }

    /// Drop a counter whose TTL could not be set
    ///
    /// Later hits see a count above 1 and never set a TTL, so the key would
    /// otherwise live forever. Best effort: the expire error is what the
    /// caller gets either way.
    async fn discard_untimed(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::error!(
                key = %key,
                error = %e,
                "Anti-flood counter left without TTL"
            );
        }
    }

    fn timestamp_key(&self, actor: &Actor, action: &str) -> String {
        format!(
            "{}:{}:{}",
            self.config.timestamp_prefix,
            actor,
            action_or_default(action)
        )
    }

    fn resolve_limit(&self, limit: Option<u32>) -> Result<u32> {
        match limit.unwrap_or(self.config.default_limit) {
            0 => Err(FloodgateError::bad_request("Anti-flood limit must be positive")),
            limit => Ok(limit),
        }
    }

    fn resolve_window(&self, window: Option<Duration>) -> Result<Duration> {
        let window =
            window.unwrap_or_else(|| Duration::from_secs(self.config.default_window_seconds));
        if window.is_zero() {
            return Err(FloodgateError::bad_request("Anti-flood window must be positive"));
        }
        if window > MAX_WINDOW {
            return Err(FloodgateError::bad_request(format!(
                "Anti-flood window must not exceed {} seconds",
                MAX_WINDOW.as_secs()
            )));
        }
        Ok(window)
    }
}

fn action_or_default(action: &str) -> &str {
    if action.is_empty() {
        DEFAULT_ACTION
    } else {
        action
    }
}

fn ensure_actor(actor: &Actor) -> Result<()> {
    if actor.is_empty() {
        return Err(FloodgateError::bad_request(
            "Anti-flood actor identifier must not be empty",
        ));
    }
    Ok(())
}
