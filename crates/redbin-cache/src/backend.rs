//! Per-bin cache backend.
//!
//! A [`CacheBackend`] owns one bin. Reads decide logical validity from the
//! entry's expiry and tag checksum; writes give the store a physical TTL
//! that outlives the logical expiry by the configured offset.

use crate::checksum::{entry_tags, ChecksumInvalidator};
use crate::item::{CacheEntry, CacheItem, CacheWrite, Expiry};
use crate::keys::KeyBuilder;
use crate::metrics;
use crate::store::{CacheStore, StoreTtl};
use crate::ttl::{PermanentTtl, StorageTtl, TtlPolicy};
use redbin_config::CacheSettings;
use redbin_core::{Clock, RedbinResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// How [`CacheBackend::invalidate_all`] treats existing entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidateAllStrategy {
    /// Remove every entry of the bin. Nothing is readable afterwards.
    Delete,
    /// Bump the bin checksum. Entries stay readable as invalid.
    #[default]
    Mark,
}

impl InvalidateAllStrategy {
    /// Picks the strategy from `invalidate_all_as_delete`.
    #[must_use]
    pub const fn from_settings(settings: &CacheSettings) -> Self {
        if settings.invalidate_all_as_delete {
            Self::Delete
        } else {
            Self::Mark
        }
    }

    /// Returns the strategy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Mark => "mark",
        }
    }
}

/// Cache backend bound to one bin.
#[derive(Clone)]
pub struct CacheBackend {
    bin: String,
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    checksums: ChecksumInvalidator,
    keys: KeyBuilder,
    policy: TtlPolicy,
    strategy: InvalidateAllStrategy,
}

impl CacheBackend {
    /// Creates a backend for `bin`.
    ///
    /// The bin name is not validated here; use
    /// [`CacheBackendFactory`](crate::CacheBackendFactory) for that.
    #[must_use]
    pub fn new(
        bin: impl Into<String>,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        keys: KeyBuilder,
        policy: TtlPolicy,
        strategy: InvalidateAllStrategy,
    ) -> Self {
        let checksums = ChecksumInvalidator::new(store.clone(), keys.clone());
        Self {
            bin: bin.into(),
            store,
            clock,
            checksums,
            keys,
            policy,
            strategy,
        }
    }

    /// Returns the bin name.
    #[must_use]
    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Returns the physical TTL of permanent entries.
    #[must_use]
    pub const fn perm_ttl(&self) -> PermanentTtl {
        self.policy.permanent()
    }

    /// Returns the grace offset in seconds.
    #[must_use]
    pub const fn ttl_offset(&self) -> u64 {
        self.policy.offset_secs()
    }

    /// Returns the bulk invalidation strategy.
    #[must_use]
    pub const fn strategy(&self) -> InvalidateAllStrategy {
        self.strategy
    }

    /// Returns the checksum invalidator used by this backend.
    #[must_use]
    pub const fn checksums(&self) -> &ChecksumInvalidator {
        &self.checksums
    }

    /// Reads an entry.
    ///
    /// Invalid entries are only returned when `allow_invalid` is set, with
    /// `valid == false`. Nothing is deleted on read.
    pub async fn get(&self, cid: &str, allow_invalid: bool) -> RedbinResult<Option<CacheItem>> {
        let key = self.keys.entry(&self.bin, cid);
        let item = match self.store.get(&key).await? {
            Some(raw) => self.prepare_item(&raw, allow_invalid).await?,
            None => None,
        };
        self.record_read(cid, item.as_ref());
        Ok(item)
    }

    /// Reads several entries, returning the hits keyed by cid.
    ///
    /// Cids missing from the result were misses.
    pub async fn get_multiple(
        &self,
        cids: &[&str],
        allow_invalid: bool,
    ) -> RedbinResult<HashMap<String, CacheItem>> {
        let keys: Vec<String> = cids
            .iter()
            .map(|cid| self.keys.entry(&self.bin, cid))
            .collect();
        let values = self.store.get_many(&keys).await?;

        let mut items = HashMap::with_capacity(cids.len());
        for (cid, value) in cids.iter().zip(values) {
            let item = match value {
                Some(raw) => self.prepare_item(&raw, allow_invalid).await?,
                None => None,
            };
            self.record_read(cid, item.as_ref());
            if let Some(item) = item {
                items.insert((*cid).to_string(), item);
            }
        }
        Ok(items)
    }

    /// Writes an entry, overwriting any previous one.
    pub async fn set(
        &self,
        cid: &str,
        data: serde_json::Value,
        expire: Expiry,
        tags: &[&str],
    ) -> RedbinResult<()> {
        let now = self.clock.now();
        let tags = entry_tags(&self.bin, tags);
        let checksum = self.checksums.current_checksum(&tags).await?;

        let entry = CacheEntry {
            cid: cid.to_string(),
            data,
            created: now,
            expire,
            checksum,
            tags,
        };
        self.write_entry(&entry, now).await
    }

    /// Writes several entries.
    pub async fn set_multiple(&self, items: Vec<CacheWrite>) -> RedbinResult<()> {
        for item in items {
            let tags: Vec<&str> = item.tags.iter().map(String::as_str).collect();
            self.set(&item.cid, item.data, item.expire, &tags).await?;
        }
        Ok(())
    }

    /// Deletes an entry. Absent entries are not an error.
    pub async fn delete(&self, cid: &str) -> RedbinResult<()> {
        self.delete_multiple(&[cid]).await
    }

    /// Deletes several entries.
    pub async fn delete_multiple(&self, cids: &[&str]) -> RedbinResult<()> {
        let keys: Vec<String> = cids
            .iter()
            .map(|cid| self.keys.entry(&self.bin, cid))
            .collect();
        let deleted = self.store.delete(&keys).await?;
        metrics::record_deletes(&self.bin, deleted);
        debug!(bin = %self.bin, requested = cids.len(), deleted, "Deleted cache entries");
        Ok(())
    }

    /// Marks an entry invalid while keeping it readable as stale.
    ///
    /// The entry is rewritten with an expiry in the past; its physical TTL
    /// is left unchanged.
    pub async fn invalidate(&self, cid: &str) -> RedbinResult<()> {
        self.invalidate_multiple(&[cid]).await
    }

    /// Marks several entries invalid.
    pub async fn invalidate_multiple(&self, cids: &[&str]) -> RedbinResult<()> {
        let keys: Vec<String> = cids
            .iter()
            .map(|cid| self.keys.entry(&self.bin, cid))
            .collect();
        let values = self.store.get_many(&keys).await?;
        let expired = Expiry::At(self.clock.now().saturating_sub(1));

        for (key, value) in keys.iter().zip(values) {
            let Some(raw) = value else { continue };
            let mut entry: CacheEntry = serde_json::from_str(&raw)?;
            entry.expire = expired;
            let json = serde_json::to_string(&entry)?;
            self.store.set(key, &json, StoreTtl::Keep).await?;
            metrics::record_invalidation(&self.bin);
            debug!(bin = %self.bin, cid = %entry.cid, "Invalidated cache entry");
        }
        Ok(())
    }

    /// Invalidates every entry carrying any of the tags, in all bins.
    pub async fn invalidate_tags(&self, tags: &[&str]) -> RedbinResult<()> {
        self.checksums.invalidate_tags(tags).await
    }

    /// Invalidates every entry of the bin using the configured strategy.
    ///
    /// Other bins are not affected.
    pub async fn invalidate_all(&self) -> RedbinResult<()> {
        match self.strategy {
            InvalidateAllStrategy::Delete => {
                let deleted = self.store.delete_prefix(&self.keys.bin_prefix(&self.bin)).await?;
                metrics::record_deletes(&self.bin, deleted);
            }
            InvalidateAllStrategy::Mark => self.checksums.invalidate_bin(&self.bin).await?,
        }
        metrics::record_invalidate_all(&self.bin, self.strategy.as_str());
        info!(bin = %self.bin, strategy = self.strategy.as_str(), "Invalidated cache bin");
        Ok(())
    }

    /// Deletes every entry of the bin, whatever the configured strategy.
    pub async fn delete_all(&self) -> RedbinResult<()> {
        let deleted = self.store.delete_prefix(&self.keys.bin_prefix(&self.bin)).await?;
        metrics::record_deletes(&self.bin, deleted);
        info!(bin = %self.bin, deleted, "Deleted all cache entries");
        Ok(())
    }

    /// Removes the bin: every entry and its checksum counter.
    pub async fn remove_bin(&self) -> RedbinResult<()> {
        self.delete_all().await?;
        self.checksums.reset_bin(&self.bin).await?;
        info!(bin = %self.bin, "Removed cache bin");
        Ok(())
    }

    /// Nothing to collect: the store expires keys on its own.
    pub async fn garbage_collection(&self) -> RedbinResult<()> {
        debug!(bin = %self.bin, "Garbage collection left to store expiry");
        Ok(())
    }

    async fn prepare_item(
        &self,
        raw: &str,
        allow_invalid: bool,
    ) -> RedbinResult<Option<CacheItem>> {
        let entry: CacheEntry = serde_json::from_str(raw)?;
        let now = self.clock.now();

        // Skip the checksum lookup when expiry alone decides the read.
        let unexpired = entry.expire.is_valid_at(now);
        if !unexpired && !allow_invalid {
            return Ok(None);
        }

        let valid = unexpired && self.checksums.is_valid(entry.checksum, &entry.tags).await?;
        if !valid && !allow_invalid {
            return Ok(None);
        }

        Ok(Some(CacheItem { entry, valid }))
    }

    async fn write_entry(&self, entry: &CacheEntry, now: i64) -> RedbinResult<()> {
        let key = self.keys.entry(&self.bin, &entry.cid);

        let ttl = match self.policy.storage_ttl(entry.expire, now) {
            StorageTtl::Seconds(seconds) => StoreTtl::Expire(seconds),
            StorageTtl::Unbounded => StoreTtl::Persist,
            StorageTtl::Expired => {
                // Already past its physical lifetime; drop any older copy.
                self.store.delete(&[key]).await?;
                debug!(bin = %self.bin, cid = %entry.cid, "Skipped write of expired cache entry");
                return Ok(());
            }
        };

        let json = serde_json::to_string(entry)?;
        self.store.set(&key, &json, ttl).await?;
        metrics::record_write(&self.bin);
        debug!(bin = %self.bin, cid = %entry.cid, ?ttl, "Stored cache entry");
        Ok(())
    }

    fn record_read(&self, cid: &str, item: Option<&CacheItem>) {
        match item {
            Some(item) if item.valid => {
                metrics::record_hit(&self.bin);
                debug!(bin = %self.bin, cid = %cid, "Cache hit");
            }
            Some(_) => {
                metrics::record_stale_hit(&self.bin);
                debug!(bin = %self.bin, cid = %cid, "Cache stale hit");
            }
            None => {
                metrics::record_miss(&self.bin);
                debug!(bin = %self.bin, cid = %cid, "Cache miss");
            }
        }
    }
}
