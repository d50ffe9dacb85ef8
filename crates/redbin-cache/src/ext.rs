//! Typed access to a bin.

use crate::backend::CacheBackend;
use crate::item::{CacheItem, Expiry};
use async_trait::async_trait;
use redbin_core::RedbinResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Untyped read and write of one bin.
///
/// Uses JSON values for type-erased storage to keep the trait object-safe.
#[async_trait]
pub trait BinCache: Send + Sync {
    /// Read an entry.
    async fn get_item(&self, cid: &str, allow_invalid: bool) -> RedbinResult<Option<CacheItem>>;

    /// Write an entry.
    async fn set_item(
        &self,
        cid: &str,
        data: serde_json::Value,
        expire: Expiry,
        tags: &[&str],
    ) -> RedbinResult<()>;
}

#[async_trait]
impl BinCache for CacheBackend {
    async fn get_item(&self, cid: &str, allow_invalid: bool) -> RedbinResult<Option<CacheItem>> {
        self.get(cid, allow_invalid).await
    }

    async fn set_item(
        &self,
        cid: &str,
        data: serde_json::Value,
        expire: Expiry,
        tags: &[&str],
    ) -> RedbinResult<()> {
        self.set(cid, data, expire, tags).await
    }
}

/// Extension trait with typed methods for convenience.
///
/// Works with any serde type; only valid entries are returned.
#[async_trait]
pub trait CacheExt: BinCache {
    /// Get a typed value from the bin.
    async fn get_typed<T: DeserializeOwned + Send>(&self, cid: &str) -> RedbinResult<Option<T>> {
        match self.get_item(cid, false).await? {
            Some(item) => Ok(Some(serde_json::from_value(item.into_data())?)),
            None => Ok(None),
        }
    }

    /// Set a typed value in the bin.
    async fn set_typed<T: Serialize + Send + Sync>(
        &self,
        cid: &str,
        value: &T,
        expire: Expiry,
        tags: &[&str],
    ) -> RedbinResult<()> {
        let data = serde_json::to_value(value)?;
        self.set_item(cid, data, expire, tags).await
    }

    /// Get a value or compute and cache it if not present.
    ///
    /// A failed write is logged; the computed value is still returned.
    async fn get_or_set<T, F, Fut>(
        &self,
        cid: &str,
        expire: Expiry,
        tags: &[&str],
        factory: F,
    ) -> RedbinResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: std::future::Future<Output = RedbinResult<T>> + Send,
    {
        if let Some(cached) = self.get_typed::<T>(cid).await? {
            return Ok(cached);
        }

        let value = factory().await?;

        if let Err(e) = self.set_typed(cid, &value, expire, tags).await {
            warn!(cid = %cid, error = %e, "Failed to cache computed value");
        }

        Ok(value)
    }
}

impl<T: BinCache + ?Sized> CacheExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InvalidateAllStrategy;
    use crate::keys::KeyBuilder;
    use crate::store::MemoryStore;
    use crate::ttl::{PermanentTtl, TtlPolicy};
    use redbin_core::{RedbinError, TestClock};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Page {
        title: String,
        views: u32,
    }

    fn backend() -> (Arc<TestClock>, CacheBackend) {
        let clock = Arc::new(TestClock::fixed(1_000));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let backend = CacheBackend::new(
            "page",
            store,
            clock.clone(),
            KeyBuilder::new("t"),
            TtlPolicy::new(3, PermanentTtl::default()),
            InvalidateAllStrategy::Mark,
        );
        (clock, backend)
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let (_, backend) = backend();
        let page = Page {
            title: "Home".to_string(),
            views: 3,
        };
        backend
            .set_typed("home", &page, Expiry::Permanent, &[])
            .await
            .unwrap();
        assert_eq!(backend.get_typed::<Page>("home").await.unwrap(), Some(page));
        assert_eq!(backend.get_typed::<Page>("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_typed_mismatch_is_serialization_error() {
        let (_, backend) = backend();
        backend
            .set_typed("n", &42, Expiry::Permanent, &[])
            .await
            .unwrap();
        let err = backend.get_typed::<Page>("n").await.unwrap_err();
        assert!(matches!(err, RedbinError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_get_or_set_computes_once_until_expiry() {
        let (clock, backend) = backend();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: u32 = backend
                .get_or_set("count", Expiry::At(1_010), &[], || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(10);
        backend
            .get_or_set("count", Expiry::At(1_030), &[], || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(8u32)
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_get_or_set_propagates_factory_error() {
        let (_, backend) = backend();
        let result: RedbinResult<u32> = backend
            .get_or_set("x", Expiry::Permanent, &[], || async {
                Err(RedbinError::internal("boom"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(backend.get_typed::<u32>("x").await.unwrap(), None);
    }
}
