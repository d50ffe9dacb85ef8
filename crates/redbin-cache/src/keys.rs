//! Store key generators for consistent key naming.
//!
//! Layout under a prefix `p`:
//! - entries: `p:bin:<bin>:<cid>`
//! - tag counters: `p:tag:<tag>`

/// Tag attached to every entry of a bin; bumping it invalidates the bin.
#[must_use]
pub fn bin_tag(bin: &str) -> String {
    format!("x-redis-bin:{}", bin)
}

/// Key builder bound to a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    /// Creates a key builder with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key of an entry.
    #[must_use]
    pub fn entry(&self, bin: &str, cid: &str) -> String {
        format!("{}:bin:{}:{}", self.prefix, bin, cid)
    }

    /// Prefix shared by every entry of a bin.
    #[must_use]
    pub fn bin_prefix(&self, bin: &str) -> String {
        format!("{}:bin:{}:", self.prefix, bin)
    }

    /// Key of a tag counter.
    #[must_use]
    pub fn tag(&self, tag: &str) -> String {
        format!("{}:tag:{}", self.prefix, tag)
    }
}
