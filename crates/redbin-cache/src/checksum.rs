//! Tag checksum invalidation.
//!
//! Every tag owns a counter in the store. An entry records the sum of its
//! tags' counters when written; bumping any of those counters makes the sums
//! disagree, which invalidates every entry carrying the tag without touching
//! the entries themselves. Each bin's own counter is its bin tag.

use crate::keys::{bin_tag, KeyBuilder};
use crate::metrics;
use crate::store::CacheStore;
use redbin_core::{RedbinError, RedbinResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Reads and bumps tag counters.
#[derive(Clone)]
pub struct ChecksumInvalidator {
    store: Arc<dyn CacheStore>,
    keys: KeyBuilder,
}

impl ChecksumInvalidator {
    /// Creates an invalidator over the given store and key layout.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, keys: KeyBuilder) -> Self {
        Self { store, keys }
    }

    /// Current checksum of a set of tags. Counters never written count as 0.
    pub async fn current_checksum(&self, tags: &[String]) -> RedbinResult<u64> {
        if tags.is_empty() {
            return Ok(0);
        }

        let counter_keys: Vec<String> = tags.iter().map(|tag| self.keys.tag(tag)).collect();
        let values = self.store.get_many(&counter_keys).await?;

        values
            .iter()
            .zip(&counter_keys)
            .try_fold(0u64, |sum, (value, key)| -> RedbinResult<u64> {
                let count = match value {
                    Some(raw) => raw.parse::<u64>().map_err(|_| {
                        RedbinError::Cache(format!("Corrupt checksum counter '{}': {}", key, raw))
                    })?,
                    None => 0,
                };
                Ok(sum.wrapping_add(count))
            })
    }

    /// Current checksum of a bin's own counter.
    pub async fn bin_checksum(&self, bin: &str) -> RedbinResult<u64> {
        self.current_checksum(&[bin_tag(bin)]).await
    }

    /// Returns true if `checksum` still matches the tags' counters.
    pub async fn is_valid(&self, checksum: u64, tags: &[String]) -> RedbinResult<bool> {
        Ok(checksum == self.current_checksum(tags).await?)
    }

    /// Invalidates every entry carrying any of the tags.
    ///
    /// Each counter is bumped with the store's atomic increment.
    pub async fn invalidate_tags<S: AsRef<str>>(&self, tags: &[S]) -> RedbinResult<()> {
        let unique: BTreeSet<&str> = tags.iter().map(AsRef::as_ref).collect();
        for tag in unique {
            let value = self.store.incr(&self.keys.tag(tag)).await?;
            metrics::record_tag_invalidation();
            debug!(tag = %tag, checksum = value, "Invalidated cache tag");
        }
        Ok(())
    }

    /// Invalidates every entry of a bin.
    pub async fn invalidate_bin(&self, bin: &str) -> RedbinResult<()> {
        self.invalidate_tags(&[bin_tag(bin)]).await
    }

    /// Removes a bin's counter.
    pub async fn reset_bin(&self, bin: &str) -> RedbinResult<()> {
        self.store.delete(&[self.keys.tag(&bin_tag(bin))]).await?;
        Ok(())
    }
}

/// Sorted, de-duplicated tags of an entry with the bin tag added.
#[must_use]
pub fn entry_tags<S: AsRef<str>>(bin: &str, tags: &[S]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.as_ref().to_string())
        .chain(std::iter::once(bin_tag(bin)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreTtl};

    fn invalidator() -> (Arc<MemoryStore>, ChecksumInvalidator) {
        let store = Arc::new(MemoryStore::new());
        let invalidator = ChecksumInvalidator::new(store.clone(), KeyBuilder::new("t"));
        (store, invalidator)
    }

    #[tokio::test]
    async fn test_unknown_tags_start_at_zero() {
        let (_, invalidator) = invalidator();
        assert_eq!(invalidator.bin_checksum("render").await.unwrap(), 0);
        assert_eq!(invalidator.current_checksum(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_checksum_sums_tag_counters() {
        let (_, invalidator) = invalidator();
        invalidator.invalidate_tags(&["a", "b", "b"]).await.unwrap();
        invalidator.invalidate_tags(&["b"]).await.unwrap();

        let tags = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(invalidator.current_checksum(&tags).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_bump_invalidates_snapshot() {
        let (_, invalidator) = invalidator();
        let tags = entry_tags("render", &["node:1"]);
        let snapshot = invalidator.current_checksum(&tags).await.unwrap();
        assert!(invalidator.is_valid(snapshot, &tags).await.unwrap());

        invalidator.invalidate_tags(&["node:2"]).await.unwrap();
        assert!(invalidator.is_valid(snapshot, &tags).await.unwrap());

        invalidator.invalidate_tags(&["node:1"]).await.unwrap();
        assert!(!invalidator.is_valid(snapshot, &tags).await.unwrap());
    }

    #[tokio::test]
    async fn test_bins_are_independent() {
        let (_, invalidator) = invalidator();
        invalidator.invalidate_bin("x").await.unwrap();
        assert_eq!(invalidator.bin_checksum("x").await.unwrap(), 1);
        assert_eq!(invalidator.bin_checksum("y").await.unwrap(), 0);

        invalidator.reset_bin("x").await.unwrap();
        assert_eq!(invalidator.bin_checksum("x").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_counter_is_error() {
        let (store, invalidator) = invalidator();
        store
            .set("t:tag:broken", "nope", StoreTtl::Persist)
            .await
            .unwrap();
        let err = invalidator
            .current_checksum(&["broken".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Corrupt checksum counter"));
    }

    #[test]
    fn test_entry_tags_adds_bin_tag_and_sorts() {
        assert_eq!(
            entry_tags("render", &["node:2", "node:1", "node:2"]),
            vec![
                "node:1".to_string(),
                "node:2".to_string(),
                "x-redis-bin:render".to_string()
            ]
        );
        assert_eq!(entry_tags::<&str>("render", &[]), vec!["x-redis-bin:render".to_string()]);
    }
}
