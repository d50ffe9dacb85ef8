//! Builds per-bin backends from configuration.

use crate::backend::{CacheBackend, InvalidateAllStrategy};
use crate::keys::KeyBuilder;
use crate::store::{CacheStore, RedisStore};
use crate::ttl::TtlPolicy;
use redbin_config::{is_valid_bin_name, AppConfig, CacheSettings};
use redbin_core::{Clock, RedbinError, RedbinResult, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Hands out [`CacheBackend`]s sharing one store, clock and configuration.
///
/// Permanent TTLs of every configured bin are resolved up front, so a bad
/// duration expression fails at construction rather than on first use.
pub struct CacheBackendFactory {
    settings: CacheSettings,
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    keys: KeyBuilder,
    strategy: InvalidateAllStrategy,
    policies: HashMap<String, TtlPolicy>,
}

impl CacheBackendFactory {
    /// Creates a factory over an existing store and describes the cache metrics.
    pub fn new(
        settings: CacheSettings,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> RedbinResult<Self> {
        if !is_valid_bin_name(&settings.key_prefix) {
            return Err(RedbinError::Configuration(format!(
                "Invalid key prefix '{}'",
                settings.key_prefix
            )));
        }

        let mut policies = HashMap::with_capacity(settings.bins.len());
        for bin in settings.bins.keys() {
            if !is_valid_bin_name(bin) {
                return Err(RedbinError::Configuration(format!(
                    "Invalid bin name '{}' in cache settings",
                    bin
                )));
            }
            policies.insert(bin.clone(), TtlPolicy::for_bin(&settings, bin)?);
        }

        let keys = KeyBuilder::new(settings.key_prefix.clone());
        let strategy = InvalidateAllStrategy::from_settings(&settings);
        crate::metrics::register_metrics();

        info!(
            prefix = %settings.key_prefix,
            bins = policies.len(),
            strategy = strategy.as_str(),
            ttl_offset_secs = settings.ttl_offset_secs,
            "Cache backend factory ready"
        );

        Ok(Self {
            settings,
            store,
            clock,
            keys,
            strategy,
            policies,
        })
    }

    /// Connects to Redis as configured and creates a factory on the system clock.
    pub async fn from_config(config: &AppConfig) -> RedbinResult<Self> {
        let store = RedisStore::connect(&config.redis).await?;
        Self::new(config.cache.clone(), Arc::new(store), Arc::new(SystemClock))
    }

    /// Returns the backend of a bin.
    pub fn get(&self, bin: &str) -> RedbinResult<CacheBackend> {
        if !is_valid_bin_name(bin) {
            return Err(RedbinError::Validation(format!(
                "Invalid bin name '{}': must be non-empty without ':' or glob characters",
                bin
            )));
        }

        let policy = match self.policies.get(bin) {
            Some(policy) => *policy,
            None => TtlPolicy::for_bin(&self.settings, bin)?,
        };

        Ok(CacheBackend::new(
            bin,
            self.store.clone(),
            self.clock.clone(),
            self.keys.clone(),
            policy,
            self.strategy,
        ))
    }

    /// Returns the cache settings.
    #[must_use]
    pub const fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Returns the shared store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn CacheStore> {
        self.store.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::ttl::{PermanentTtl, LIFETIME_PERM_DEFAULT};
    use redbin_core::FixedClock;

    fn factory(settings: CacheSettings) -> RedbinResult<CacheBackendFactory> {
        CacheBackendFactory::new(
            settings,
            Arc::new(MemoryStore::new()),
            Arc::new(FixedClock(1_000)),
        )
    }

    #[test]
    fn test_get_resolves_bin_policy() {
        let settings = CacheSettings::default()
            .with_perm_ttl_seconds("render", 60)
            .with_legacy_perm_ttl("data", 900);
        let factory = factory(settings).unwrap();

        assert_eq!(factory.get("render").unwrap().perm_ttl(), PermanentTtl::Seconds(60));
        assert_eq!(factory.get("data").unwrap().perm_ttl(), PermanentTtl::Seconds(900));
        assert_eq!(
            factory.get("other").unwrap().perm_ttl(),
            PermanentTtl::Seconds(LIFETIME_PERM_DEFAULT)
        );
        assert_eq!(factory.get("render").unwrap().ttl_offset(), 3);
        assert_eq!(factory.settings().ttl_offset_secs, 3);
        assert!(factory.store().is_enabled());
    }

    #[test]
    fn test_invalid_bin_name_rejected() {
        let factory = factory(CacheSettings::default()).unwrap();
        for bin in ["", "a:b", "a*", "a?", "[a]", "a\\b"] {
            let err = factory.get(bin).err().unwrap();
            assert!(matches!(err, RedbinError::Validation(_)), "{bin:?}");
        }
    }

    #[test]
    fn test_bad_expression_fails_at_construction() {
        let settings = CacheSettings::default().with_perm_ttl_datestring("render", "one day");
        let err = factory(settings).err().unwrap();
        assert!(matches!(err, RedbinError::Configuration(_)));
    }

    #[test]
    fn test_bad_prefix_fails_at_construction() {
        let mut settings = CacheSettings::default();
        settings.key_prefix = "app:cache".to_string();
        assert!(factory(settings).is_err());
    }

    #[test]
    fn test_strategy_follows_settings() {
        let mut settings = CacheSettings::default();
        settings.invalidate_all_as_delete = true;
        let factory = factory(settings).unwrap();
        assert_eq!(
            factory.get("render").unwrap().strategy(),
            InvalidateAllStrategy::Delete
        );
    }
}
