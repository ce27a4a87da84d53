//! # Redis Sorted Store
//!
//! `SortedStore` over a single Redis sorted set.
//! Adds are `ZADD`, range reads are `ZRANGEBYSCORE`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use relay_core::{RelayError, RelayResult, SortedStore, LEDGER_KEY};
use tracing::info;

/// Ledger store backed by one Redis sorted set
#[derive(Clone)]
pub struct RedisSortedStore {
    redis: ConnectionManager,
    key: String,
}

impl RedisSortedStore {
    /// Connect and verify the server answers.
    ///
    /// Any failure here is a configuration error: the relay must not start
    /// serving without its ledger.
    pub async fn connect(url: &str) -> RelayResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| RelayError::Configuration(format!("invalid REDIS_URL: {}", e)))?;
        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| RelayError::Configuration(format!("Redis unreachable: {}", e)))?;

        let store = Self {
            redis,
            key: LEDGER_KEY.to_string(),
        };
        store
            .ping()
            .await
            .map_err(|e| RelayError::Configuration(e.to_string()))?;

        info!(key = %store.key, "Connected to Redis ledger");
        Ok(store)
    }

    /// Use a different sorted-set key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn ping(&self) -> RelayResult<()> {
        let mut conn = self.redis.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

#[async_trait]
impl SortedStore for RedisSortedStore {
    async fn add(&self, score: i64, member: String) -> RelayResult<()> {
        let mut conn = self.redis.clone();
        let _: () = conn
            .zadd(&self.key, member, score)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn range_by_score(&self, min: i64, max: i64) -> RelayResult<Vec<String>> {
        let mut conn = self.redis.clone();
        conn.zrangebyscore(&self.key, min, max)
            .await
            .map_err(store_error)
    }
}

fn store_error(e: redis::RedisError) -> RelayError {
    RelayError::Store(format!("Redis: {}", e))
}
