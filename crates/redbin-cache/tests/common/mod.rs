//! Common test infrastructure for cache backend tests.

#![allow(dead_code)]

use redbin_cache::{CacheBackend, CacheBackendFactory, MemoryStore};
use redbin_config::CacheSettings;
use redbin_core::TestClock;
use std::sync::Arc;

/// Start time of every harness clock.
pub const START: i64 = 1_700_000_000;

/// In-memory cache harness.
///
/// The store and the backends share one [`TestClock`], so advancing it moves
/// logical and physical time together.
pub struct TestCache {
    pub clock: Arc<TestClock>,
    pub store: Arc<MemoryStore>,
    pub factory: CacheBackendFactory,
}

impl TestCache {
    /// Creates a harness with default settings.
    pub fn new() -> Self {
        Self::with_settings(CacheSettings::default())
    }

    /// Creates a harness with the given settings.
    pub fn with_settings(settings: CacheSettings) -> Self {
        let clock = Arc::new(TestClock::fixed(START));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let factory = CacheBackendFactory::new(settings, store.clone(), clock.clone())
            .expect("Failed to create cache factory");
        Self {
            clock,
            store,
            factory,
        }
    }

    /// Creates a harness with the given offset and bulk invalidation mode.
    pub fn with_offset(ttl_offset_secs: u64, invalidate_all_as_delete: bool) -> Self {
        let settings = CacheSettings {
            ttl_offset_secs,
            invalidate_all_as_delete,
            ..CacheSettings::default()
        };
        Self::with_settings(settings)
    }

    /// Returns the backend of a bin.
    pub fn bin(&self, bin: &str) -> CacheBackend {
        self.factory.get(bin).expect("Failed to get cache bin")
    }

    /// Current harness time.
    pub fn now(&self) -> i64 {
        use redbin_core::Clock;
        self.clock.now()
    }
}
