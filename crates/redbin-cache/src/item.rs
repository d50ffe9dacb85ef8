//! Cache entries as stored and as returned to callers.

use serde::{Deserialize, Serialize};

/// Logical expiry of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// Never expires logically.
    Permanent,
    /// Expires at this unix timestamp (seconds).
    At(i64),
}

impl Expiry {
    /// Expiry `seconds` after `now`.
    #[must_use]
    pub const fn after(now: i64, seconds: i64) -> Self {
        Self::At(now.saturating_add(seconds))
    }

    /// Returns true if the entry is still logically valid at `now`.
    #[must_use]
    pub const fn is_valid_at(&self, now: i64) -> bool {
        match self {
            Self::Permanent => true,
            Self::At(timestamp) => *timestamp > now,
        }
    }

    /// Returns true for [`Expiry::Permanent`].
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent)
    }
}

/// Entry as serialized into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cache id, unique within the bin.
    pub cid: String,
    /// Payload.
    pub data: serde_json::Value,
    /// Write time (unix seconds).
    pub created: i64,
    /// Logical expiry.
    pub expire: Expiry,
    /// Sum of the tag counters when the entry was written.
    pub checksum: u64,
    /// Sorted tags, including the bin tag.
    pub tags: Vec<String>,
}

/// Entry returned by a read.
///
/// Plain reads only ever return valid items. Allow-invalid reads can return
/// items with `valid == false`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheItem {
    /// Stored entry.
    pub entry: CacheEntry,
    /// Whether the entry is logically valid.
    pub valid: bool,
}

impl CacheItem {
    /// Cache id of the item.
    #[must_use]
    pub fn cid(&self) -> &str {
        &self.entry.cid
    }

    /// Payload of the item.
    #[must_use]
    pub const fn data(&self) -> &serde_json::Value {
        &self.entry.data
    }

    /// Consumes the item and returns its payload.
    #[must_use]
    pub fn into_data(self) -> serde_json::Value {
        self.entry.data
    }
}

/// One entry of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheWrite {
    /// Cache id.
    pub cid: String,
    /// Payload.
    pub data: serde_json::Value,
    /// Logical expiry.
    pub expire: Expiry,
    /// Invalidation tags.
    pub tags: Vec<String>,
}

impl CacheWrite {
    /// Creates a permanent, untagged write.
    #[must_use]
    pub fn new(cid: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            cid: cid.into(),
            data,
            expire: Expiry::Permanent,
            tags: Vec::new(),
        }
    }

    /// Sets the logical expiry.
    #[must_use]
    pub const fn expire(mut self, expire: Expiry) -> Self {
        self.expire = expire;
        self
    }

    /// Sets the invalidation tags.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expiry_validity_is_strict() {
        let expire = Expiry::At(100);
        assert!(expire.is_valid_at(99));
        assert!(!expire.is_valid_at(100));
        assert!(!expire.is_valid_at(101));
        assert!(Expiry::Permanent.is_valid_at(i64::MAX));
    }

    #[test]
    fn test_expiry_after() {
        assert_eq!(Expiry::after(1_000, 30), Expiry::At(1_030));
        assert_eq!(Expiry::after(i64::MAX, 1), Expiry::At(i64::MAX));
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = CacheEntry {
            cid: "a".to_string(),
            data: json!({"n": 1}),
            created: 10,
            expire: Expiry::At(20),
            checksum: 2,
            tags: vec!["x-redis-bin:render".to_string()],
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["expire"], json!({"at": 20}));

        let permanent = CacheEntry {
            expire: Expiry::Permanent,
            ..entry
        };
        let json = serde_json::to_string(&permanent).unwrap();
        assert!(json.contains(r#""expire":"permanent""#));
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, permanent);
    }

    #[test]
    fn test_cache_write_builder() {
        let write = CacheWrite::new("k", json!(1))
            .expire(Expiry::At(5))
            .tags(["node:1", "node:2"]);
        assert_eq!(write.expire, Expiry::At(5));
        assert_eq!(write.tags, vec!["node:1".to_string(), "node:2".to_string()]);
    }
}
