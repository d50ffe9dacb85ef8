//! Dependency injection module using Shaku.
//!
//! `CacheModule` provides the [`CacheStore`] for host applications that wire
//! their services through Shaku.

use crate::factory::CacheBackendFactory;
use crate::store::{create_pool, CacheStore, RedisStore, RedisStoreParameters};
use redbin_config::{AppConfig, RedisConfig};
use redbin_core::{module, Clock, HasComponent, RedbinResult};
use std::sync::Arc;

// Cache module: Redis-backed store only.
module! {
    pub CacheModule {
        components = [RedisStore],
        providers = [],
    }
}

/// Builds the cache module, connecting to Redis if it is enabled.
pub async fn build_cache_module(redis_config: &RedisConfig) -> RedbinResult<Arc<CacheModule>> {
    let pool = if redis_config.enabled {
        Some(Arc::new(create_pool(redis_config).await?))
    } else {
        None
    };

    let module = CacheModule::builder()
        .with_component_parameters::<RedisStore>(RedisStoreParameters { pool })
        .build();

    Ok(Arc::new(module))
}

/// Builds a backend factory on the store resolved from `module`.
pub fn factory_from_module(
    module: &CacheModule,
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> RedbinResult<CacheBackendFactory> {
    let store: Arc<dyn CacheStore> = module.resolve();
    CacheBackendFactory::new(config.cache.clone(), store, clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::names;
    use ::metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use parking_lot::Mutex;
    use redbin_core::FixedClock;

    /// Recorder keeping the names of described metrics.
    #[derive(Default)]
    struct DescribedNames(Mutex<Vec<String>>);

    impl DescribedNames {
        fn push(&self, key: KeyName) {
            self.0.lock().push(key.as_str().to_string());
        }
    }

    impl Recorder for DescribedNames {
        fn describe_counter(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.push(key);
        }

        fn describe_gauge(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.push(key);
        }

        fn describe_histogram(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.push(key);
        }

        fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
            Counter::noop()
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[tokio::test]
    async fn test_disabled_module_resolves_noop_store() {
        let config = RedisConfig {
            enabled: false,
            ..RedisConfig::default()
        };
        let module = build_cache_module(&config).await.unwrap();
        let store: Arc<dyn CacheStore> = module.resolve();
        assert!(!store.is_enabled());
    }

    #[tokio::test]
    async fn test_factory_from_disabled_module_always_misses() {
        let mut config = AppConfig::default();
        config.redis.enabled = false;
        let module = build_cache_module(&config.redis).await.unwrap();
        let factory = factory_from_module(&module, &config, Arc::new(FixedClock(1_000))).unwrap();

        let render = factory.get("render").unwrap();
        render
            .set("a", serde_json::json!(1), crate::Expiry::Permanent, &[])
            .await
            .unwrap();
        assert!(render.get("a", true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_factory_from_module_describes_metrics() {
        let mut config = AppConfig::default();
        config.redis.enabled = false;
        let module = build_cache_module(&config.redis).await.unwrap();

        let recorder = DescribedNames::default();
        ::metrics::with_local_recorder(&recorder, || {
            factory_from_module(&module, &config, Arc::new(FixedClock(1_000))).unwrap();
        });

        let described = recorder.0.lock();
        assert!(described.iter().any(|name| name == names::CACHE_HITS_TOTAL));
        assert!(described.iter().any(|name| name == names::CACHE_INVALIDATE_ALL_TOTAL));
    }
}
