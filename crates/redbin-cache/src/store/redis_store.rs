//! Redis-backed store.

use super::{CacheStore, StoreTtl};
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redbin_config::RedisConfig;
use redbin_core::{RedbinError, RedbinResult};
use redis::AsyncCommands;
use shaku::Component;
use std::sync::Arc;
use tracing::{debug, info};

/// Keys requested per SCAN round trip.
const SCAN_COUNT: usize = 500;

/// Create a Redis connection pool and check it answers PING.
pub async fn create_pool(config: &RedisConfig) -> RedbinResult<Pool> {
    info!("Creating Redis connection pool for cache...");

    let pool = Config::from_url(&config.url)
        .builder()
        .map_err(|e| RedbinError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| RedbinError::Configuration(format!("Failed to create pool: {}", e)))?;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| RedbinError::Cache(format!("Failed to get Redis connection: {}", e)))?;
    let _: String = redis::cmd("PING")
        .query_async(&mut *conn)
        .await
        .map_err(|e| RedbinError::Cache(format!("Redis PING failed: {}", e)))?;

    info!("Redis connection pool created successfully");
    Ok(pool)
}

/// Store backed by a Redis connection pool.
#[derive(Component)]
#[shaku(interface = CacheStore)]
pub struct RedisStore {
    /// Redis connection pool, `None` when caching is disabled.
    pool: Option<Arc<Pool>>,
}

impl RedisStore {
    /// Create a store on an existing pool.
    #[must_use]
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool: Some(pool) }
    }

    /// Create a no-op store (for when Redis is disabled).
    ///
    /// Reads always miss and writes are dropped.
    #[must_use]
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    /// Connect using the given configuration, or build a disabled store.
    pub async fn connect(config: &RedisConfig) -> RedbinResult<Self> {
        if config.enabled {
            Ok(Self::new(Arc::new(create_pool(config).await?)))
        } else {
            info!("Redis disabled, cache reads will always miss");
            Ok(Self::disabled())
        }
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> RedbinResult<deadpool_redis::Connection> {
        match &self.pool {
            Some(pool) => pool.get().await.map_err(|e| {
                RedbinError::Cache(format!("Failed to get Redis connection: {}", e))
            }),
            None => Err(RedbinError::Cache("Cache is disabled".to_string())),
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    async fn get(&self, key: &str) -> RedbinResult<Option<String>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(key).await.map_err(|e| {
            RedbinError::Cache(format!("Failed to get key '{}': {}", key, e))
        })?;

        Ok(value)
    }

    async fn get_many(&self, keys: &[String]) -> RedbinResult<Vec<Option<String>>> {
        if !self.is_enabled() {
            return Ok(vec![None; keys.len()]);
        }
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.get_conn().await?;
        // Explicit MGET: a single key must still come back as an array.
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut *conn)
            .await
            .map_err(|e| RedbinError::Cache(format!("Failed to get {} keys: {}", keys.len(), e)))?;

        Ok(values)
    }

    async fn set(&self, key: &str, value: &str, ttl: StoreTtl) -> RedbinResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let mut conn = self.get_conn().await?;
        let result: redis::RedisResult<()> = match ttl {
            StoreTtl::Expire(seconds) => conn.set_ex::<_, _, ()>(key, value, seconds).await,
            StoreTtl::Persist => conn.set::<_, _, ()>(key, value).await,
            StoreTtl::Keep => {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("KEEPTTL")
                    .arg("XX")
                    .query_async(&mut *conn)
                    .await
            }
        };

        result.map_err(|e| RedbinError::Cache(format!("Failed to set key '{}': {}", key, e)))?;
        debug!("Stored key '{}' with {:?}", key, ttl);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> RedbinResult<u64> {
        if !self.is_enabled() || keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn().await?;
        let deleted: i64 = conn.del(keys).await.map_err(|e| {
            RedbinError::Cache(format!("Failed to delete {} keys: {}", keys.len(), e))
        })?;

        Ok(u64::try_from(deleted).unwrap_or(0))
    }

    async fn incr(&self, key: &str) -> RedbinResult<i64> {
        if !self.is_enabled() {
            return Ok(0);
        }

        let mut conn = self.get_conn().await?;
        let value: i64 = conn.incr(key, 1i64).await.map_err(|e| {
            RedbinError::Cache(format!("Failed to increment key '{}': {}", key, e))
        })?;

        Ok(value)
    }

    async fn delete_prefix(&self, prefix: &str) -> RedbinResult<u64> {
        if !self.is_enabled() {
            return Ok(0);
        }

        let mut conn = self.get_conn().await?;
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut *conn)
                .await
                .map_err(|e| RedbinError::Cache(format!("Failed to scan keys: {}", e)))?;

            if !keys.is_empty() {
                let removed: i64 = conn.del(&keys).await.map_err(|e| {
                    RedbinError::Cache(format!("Failed to delete keys: {}", e))
                })?;
                deleted += u64::try_from(removed).unwrap_or(0);
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!("Deleted {} keys matching pattern '{}'", deleted, pattern);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_store() {
        let store = RedisStore::disabled();
        assert!(!store.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_store_misses_and_drops_writes() {
        let store = RedisStore::disabled();
        store.set("k", "v", StoreTtl::Persist).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(
            store.get_many(&["a".to_string(), "b".to_string()]).await.unwrap(),
            vec![None, None]
        );
        assert_eq!(store.delete(&["k".to_string()]).await.unwrap(), 0);
        assert_eq!(store.delete_prefix("p:").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connect_disabled() {
        let config = RedisConfig {
            enabled: false,
            ..RedisConfig::default()
        };
        let store = RedisStore::connect(&config).await.unwrap();
        assert!(!store.is_enabled());
    }
}
