//! In-process store for tests and local development.

use super::{CacheStore, StoreTtl};
use async_trait::async_trait;
use parking_lot::Mutex;
use redbin_core::{Clock, RedbinError, RedbinResult, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<i64>,
}

impl StoredValue {
    fn is_live(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// Store keeping everything in a map.
///
/// Physical expiry follows the store's own clock. Sharing a
/// [`TestClock`](redbin_core::TestClock) with the backend lets tests move
/// logical and physical time together without sleeping.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Creates an empty store on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store on the given clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.lock().values().filter(|v| v.is_live(now)).count()
    }

    /// Returns true if no live key exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining physical TTL of a key.
    ///
    /// `None` when the key is absent, `Some(None)` when it never expires.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Option<i64>> {
        let now = self.clock.now();
        self.entries
            .lock()
            .get(key)
            .filter(|v| v.is_live(now))
            .map(|v| v.expires_at.map(|expires_at| expires_at - now))
    }

    fn live_value(
        entries: &mut HashMap<String, StoredValue>,
        key: &str,
        now: i64,
    ) -> Option<String> {
        match entries.get(key) {
            Some(stored) if stored.is_live(now) => Some(stored.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> RedbinResult<Option<String>> {
        let now = self.clock.now();
        Ok(Self::live_value(&mut self.entries.lock(), key, now))
    }

    async fn get_many(&self, keys: &[String]) -> RedbinResult<Vec<Option<String>>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        Ok(keys
            .iter()
            .map(|key| Self::live_value(&mut entries, key, now))
            .collect())
    }

    async fn set(&self, key: &str, value: &str, ttl: StoreTtl) -> RedbinResult<()> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let expires_at = match ttl {
            StoreTtl::Expire(0) => {
                return Err(RedbinError::Cache(format!(
                    "Failed to set key '{}': invalid expire time",
                    key
                )))
            }
            StoreTtl::Expire(seconds) => {
                Some(now.saturating_add(i64::try_from(seconds).unwrap_or(i64::MAX)))
            }
            StoreTtl::Persist => None,
            StoreTtl::Keep => match entries.get(key) {
                Some(stored) if stored.is_live(now) => stored.expires_at,
                _ => return Ok(()),
            },
        };

        entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> RedbinResult<u64> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let mut deleted = 0;
        for key in keys {
            if let Some(stored) = entries.remove(key) {
                if stored.is_live(now) {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    async fn incr(&self, key: &str) -> RedbinResult<i64> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let (current, expires_at) = match entries.get(key) {
            Some(stored) if stored.is_live(now) => {
                let current: i64 = stored.value.parse().map_err(|_| {
                    RedbinError::Cache(format!(
                        "Failed to increment key '{}': value is not an integer",
                        key
                    ))
                })?;
                (current, stored.expires_at)
            }
            _ => (0, None),
        };

        let next = current.checked_add(1).ok_or_else(|| {
            RedbinError::Cache(format!("Failed to increment key '{}': overflow", key))
        })?;
        entries.insert(
            key.to_string(),
            StoredValue {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn delete_prefix(&self, prefix: &str) -> RedbinResult<u64> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let mut deleted = 0;
        entries.retain(|key, stored| {
            if key.starts_with(prefix) {
                if stored.is_live(now) {
                    deleted += 1;
                }
                false
            } else {
                true
            }
        });
        Ok(deleted)
    }
}
