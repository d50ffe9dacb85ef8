//! Backing store abstraction.
//!
//! The cache backend needs only a handful of primitives from its store; any
//! key-value engine offering them can sit underneath.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::{create_pool, RedisStore, RedisStoreParameters};

use async_trait::async_trait;
use redbin_core::{Interface, RedbinResult};

/// Expiry instruction for a store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTtl {
    /// Expire after this many seconds. Must be positive.
    Expire(u64),
    /// No expiry.
    Persist,
    /// Keep the key's current expiry. Writes nothing if the key is absent.
    Keep,
}

/// Key-value store holding cache entries and tag counters.
#[async_trait]
pub trait CacheStore: Interface + Send + Sync {
    /// Get the value of a key.
    async fn get(&self, key: &str) -> RedbinResult<Option<String>>;

    /// Get the values of several keys, in order.
    async fn get_many(&self, keys: &[String]) -> RedbinResult<Vec<Option<String>>>;

    /// Set the value of a key.
    async fn set(&self, key: &str, value: &str, ttl: StoreTtl) -> RedbinResult<()>;

    /// Delete keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> RedbinResult<u64>;

    /// Atomically increment a counter, creating it at zero.
    async fn incr(&self, key: &str) -> RedbinResult<i64>;

    /// Delete every key starting with `prefix`.
    ///
    /// The prefix must not contain glob metacharacters.
    async fn delete_prefix(&self, prefix: &str) -> RedbinResult<u64>;

    /// Check if the store is enabled.
    fn is_enabled(&self) -> bool {
        true
    }
}
