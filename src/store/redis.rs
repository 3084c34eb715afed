use crate::error::{FloodgateError, Result};
use crate::traits::counter::CounterStore;
use async_trait::async_trait;
use std::time::Duration;

/// Redis counter store
///
/// Every method is a single round-trip. Connection and command failures
/// surface as [`FloodgateError::Store`]; nothing here retries.
#[derive(Clone)]
pub struct RedisCounterStore {
    client: redis::Client,
}

impl RedisCounterStore {
    /// Create a new Redis store from a connection URL
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| FloodgateError::store(format!("Failed to create Redis client: {}", e)))?;

        Ok(Self { client })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| FloodgateError::store(format!("Failed to get Redis connection: {}", e)))
    }
}

/// Redis TTLs are whole seconds; anything shorter still lives for one.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.get_connection().await?;

        redis::cmd("INCR")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| FloodgateError::store(format!("Redis INCR failed: {}", e)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.get_connection().await?;

        let applied = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds(ttl))
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| FloodgateError::store(format!("Redis EXPIRE failed: {}", e)))?;

        Ok(applied == 1)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>> {
        let mut conn = self.get_connection().await?;

        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<i64>>(&mut conn)
            .await
            .map_err(|e| FloodgateError::store(format!("Redis GET failed: {}", e)))
    }

    async fn set_ex(&self, key: &str, value: i64, ttl: Duration) -> Result<()> {
        let mut conn = self.get_connection().await?;

        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_seconds(ttl))
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| FloodgateError::store(format!("Redis SETEX failed: {}", e)))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;

        let removed = redis::cmd("DEL")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| FloodgateError::store(format!("Redis DEL failed: {}", e)))?;

        Ok(removed > 0)
    }

    fn is_healthy(&self) -> bool {
        // Best effort; a blocking connect is acceptable for a health probe
        self.client.get_connection().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_seconds_rounds_up_to_one() {
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(3600)), 3600);
    }

    #[test]
    fn test_invalid_url_is_store_error() {
        let result = RedisCounterStore::new("not a url");
        assert!(matches!(result, Err(FloodgateError::Store(_))));
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_counter_roundtrip() {
        let store = RedisCounterStore::new("redis://127.0.0.1/").unwrap();
        let key = format!("floodgate_test:{}", uuid::Uuid::new_v4());

        assert_eq!(store.incr(&key).await.unwrap(), 1);
        assert!(store.expire(&key, Duration::from_secs(30)).await.unwrap());
        assert_eq!(store.incr(&key).await.unwrap(), 2);
        assert_eq!(store.get(&key).await.unwrap(), Some(2));
        assert!(store.delete(&key).await.unwrap());
        assert_eq!(store.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_redis_propagates() {
        // Port 1 is never a Redis server; the error must surface
        let store = RedisCounterStore::new("redis://127.0.0.1:1/").unwrap();
        let result = store.incr("k").await;
        assert!(matches!(result, Err(FloodgateError::Store(_))));
    }
}
