//! Fast idempotency cache backed by Redis.
//!
//! Only three primitives are used: atomic set-if-absent-with-TTL for
//! reservations, plain GET, and plain SET-with-TTL for terminal outcomes.

use redis::{Client, aio::ConnectionManager};

const KEY_PREFIX: &str = "idempotency";

pub struct IdempotencyCache {
    connection_manager: ConnectionManager,
}

impl IdempotencyCache {
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = Client::open(redis_url)?;
        let connection_manager = ConnectionManager::new(client).await?;

        tracing::info!("Redis connection established");
        Ok(IdempotencyCache { connection_manager })
    }

    /// Cache key for a client-supplied idempotency key.
    pub fn cache_key(key: &str) -> String {
        format!("{}:{}", KEY_PREFIX, key)
    }

    /// Store `value` under `key` only if the key is absent, with a TTL.
    /// Returns true when this caller won the reservation.
    pub async fn reserve(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = self.connection_manager.clone();

        let outcome: Option<String> = redis::cmd("SET")
            .arg(Self::cache_key(key))
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await?;

        Ok(outcome.is_some())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.connection_manager.clone();

        redis::cmd("GET")
            .arg(Self::cache_key(key))
            .query_async(&mut conn)
            .await
    }

    /// Overwrite the key's value and extend its TTL.
    pub async fn put(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.connection_manager.clone();

        redis::cmd("SET")
            .arg(Self::cache_key(key))
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_REDIS_URL: &str = "redis://127.0.0.1:6379";

    #[test]
    fn test_cache_key_layout() {
        assert_eq!(IdempotencyCache::cache_key("k1"), "idempotency:k1");
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_reserve_is_first_writer_wins() {
        let cache = IdempotencyCache::connect(TEST_REDIS_URL)
            .await
            .expect("Failed to connect");

        let key = format!("test-{}", uuid::Uuid::new_v4());
        assert!(cache.reserve(&key, "a", 5).await.unwrap());
        assert!(!cache.reserve(&key, "b", 5).await.unwrap());
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("a"));
    }
}
