//! Key-value cache used for rate limiting and the admin statistics.
//!
//! `Cache` speaks JSON over a pluggable [`CacheBackend`]: Redis in
//! production, an in-process map for tests and single-node development.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::{Config, CACHE_KEY_ADMIN_STATS, CACHE_PREFIX_RATE_LIMIT};
use crate::domain::DashboardStats;
use crate::errors::{AppError, AppResult};

/// Raw string operations a cache store must provide.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Increment a counter, starting its expiry window on the first hit.
    async fn incr_with_expiry(&self, key: &str, window_seconds: u64) -> AppResult<u64>;

    async fn ping(&self) -> AppResult<()>;
}

// =============================================================================
// Redis
// =============================================================================

#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self, RedisError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

fn cache_error(e: RedisError) -> AppError {
    AppError::Cache(e.to_string())
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(cache_error)
    }

    async fn set_ex(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(cache_error)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await.map_err(cache_error)
    }

    async fn incr_with_expiry(&self, key: &str, window_seconds: u64) -> AppResult<u64> {
        let mut conn = self.connection.clone();
        let count: i64 = conn.incr(key, 1).await.map_err(cache_error)?;
        if count == 1 {
            conn.expire::<_, ()>(key, window_seconds as i64)
                .await
                .map_err(cache_error)?;
        }
        Ok(count.max(0) as u64)
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(cache_error)
    }
}

// =============================================================================
// In-process
// =============================================================================

/// Process-local store with per-key expiry.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Cache("memory cache lock poisoned".to_string()))
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds);
        self.lock()?.insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, window_seconds: u64) -> AppResult<u64> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let count = match entries.get(key) {
            Some((value, expires_at)) if *expires_at > now => {
                let next = value.parse::<u64>().unwrap_or(0) + 1;
                let expires_at = *expires_at;
                entries.insert(key.to_string(), (next.to_string(), expires_at));
                next
            }
            _ => {
                let expires_at = now + Duration::from_secs(window_seconds);
                entries.insert(key.to_string(), ("1".to_string(), expires_at));
                1
            }
        };
        Ok(count)
    }

    async fn ping(&self) -> AppResult<()> {
        self.lock().map(|_| ())
    }
}

// =============================================================================
// Typed facade
// =============================================================================

/// Outcome of one rate-limited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub count: u64,
    pub limit: u64,
    pub allowed: bool,
}

impl RateLimitDecision {
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }
}

#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Connect to the Redis instance named in the configuration.
    pub async fn connect(config: &Config) -> Result<Self, RedisError> {
        let backend = RedisBackend::connect(&config.redis_url).await?;
        tracing::info!("Redis cache connected");
        Ok(Self::new(Arc::new(backend)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.backend.get(key).await? {
            Some(json) => {
                let parsed = serde_json::from_str(&json).map_err(|e| {
                    AppError::internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) -> AppResult<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::internal(format!("Cache serialization error: {}", e)))?;
        self.backend.set_ex(key, json, ttl_seconds).await
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        self.backend.delete(key).await
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.backend.ping().await
    }

    /// Fixed-window counter for `identifier`.
    pub async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<RateLimitDecision> {
        let key = format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier);
        let count = self.backend.incr_with_expiry(&key, window_seconds).await?;
        Ok(RateLimitDecision {
            count,
            limit: max_requests,
            allowed: count <= max_requests,
        })
    }

    // =========================================================================
    // Admin statistics
    // =========================================================================

    pub async fn get_stats(&self) -> AppResult<Option<DashboardStats>> {
        self.get(CACHE_KEY_ADMIN_STATS).await
    }

    pub async fn set_stats(&self, stats: &DashboardStats, ttl_seconds: u64) -> AppResult<()> {
        self.set(CACHE_KEY_ADMIN_STATS, stats, ttl_seconds).await
    }

    /// Drop cached statistics. Failures are logged, never raised, so a cache
    /// outage cannot undo an already committed mutation.
    pub async fn invalidate_stats(&self) {
        if let Err(e) = self.delete(CACHE_KEY_ADMIN_STATS).await {
            tracing::warn!(error = %e, "Failed to invalidate cached admin stats");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let cache = Cache::in_memory();
        let sample = Sample {
            name: "stats".into(),
        };
        cache.set("k", &sample, 60).await.unwrap();
        assert_eq!(cache.get::<Sample>("k").await.unwrap(), Some(sample));

        cache.delete("k").await.unwrap();
        assert_eq!(cache.get::<Sample>("k").await.unwrap(), None);
    }

    #[test]
    fn test_expired_entries_disappear() {
        let backend = MemoryBackend::new();
        tokio_test::block_on(backend.set_ex("k", "v".into(), 0)).unwrap();
        assert_eq!(tokio_test::block_on(backend.get("k")).unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server (REDIS_URL)"]
    async fn test_redis_backend_ping_and_counter() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let backend = RedisBackend::connect(&url).await.unwrap();
        backend.ping().await.unwrap();

        let key = format!("test:{}", uuid::Uuid::new_v4());
        assert_eq!(backend.incr_with_expiry(&key, 5).await.unwrap(), 1);
        assert_eq!(backend.incr_with_expiry(&key, 5).await.unwrap(), 2);
        backend.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_rate_limit_counts_within_window() {
        let cache = Cache::in_memory();
        for expected in 1..=3 {
            let decision = cache.check_rate_limit("10.0.0.1", 2, 60).await.unwrap();
            assert_eq!(decision.count, expected);
            assert_eq!(decision.allowed, expected <= 2);
        }
        let other = cache.check_rate_limit("10.0.0.2", 2, 60).await.unwrap();
        assert!(other.allowed);
        assert_eq!(other.remaining(), 1);
    }
}
