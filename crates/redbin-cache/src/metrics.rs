//! Cache metrics.
//!
//! Counters are recorded through the `metrics` facade; they are no-ops until
//! the host installs a recorder.

use metrics::{counter, describe_counter};

/// Metric names for the cache backend.
pub mod names {
    /// Reads returning a valid entry.
    pub const CACHE_HITS_TOTAL: &str = "redbin_cache_hits_total";
    /// Reads returning nothing.
    pub const CACHE_MISSES_TOTAL: &str = "redbin_cache_misses_total";
    /// Allow-invalid reads returning an invalid entry.
    pub const CACHE_STALE_HITS_TOTAL: &str = "redbin_cache_stale_hits_total";
    /// Entries written.
    pub const CACHE_WRITES_TOTAL: &str = "redbin_cache_writes_total";
    /// Entries deleted.
    pub const CACHE_DELETES_TOTAL: &str = "redbin_cache_deletes_total";
    /// Single entries invalidated.
    pub const CACHE_INVALIDATIONS_TOTAL: &str = "redbin_cache_invalidations_total";
    /// Bin-wide invalidations.
    pub const CACHE_INVALIDATE_ALL_TOTAL: &str = "redbin_cache_invalidate_all_total";
    /// Tag counter increments.
    pub const CACHE_TAG_INVALIDATIONS_TOTAL: &str = "redbin_cache_tag_invalidations_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Cache reads that returned a valid entry");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Cache reads that returned nothing");
    describe_counter!(
        names::CACHE_STALE_HITS_TOTAL,
        "Allow-invalid cache reads that returned an invalid entry"
    );
    describe_counter!(names::CACHE_WRITES_TOTAL, "Cache entries written");
    describe_counter!(names::CACHE_DELETES_TOTAL, "Cache entries deleted");
    describe_counter!(names::CACHE_INVALIDATIONS_TOTAL, "Cache entries invalidated");
    describe_counter!(
        names::CACHE_INVALIDATE_ALL_TOTAL,
        "Bin-wide cache invalidations by strategy"
    );
    describe_counter!(
        names::CACHE_TAG_INVALIDATIONS_TOTAL,
        "Cache tag checksum increments"
    );
}

pub(crate) fn record_hit(bin: &str) {
    counter!(names::CACHE_HITS_TOTAL, "bin" => bin.to_string()).increment(1);
}

pub(crate) fn record_miss(bin: &str) {
    counter!(names::CACHE_MISSES_TOTAL, "bin" => bin.to_string()).increment(1);
}

pub(crate) fn record_stale_hit(bin: &str) {
    counter!(names::CACHE_STALE_HITS_TOTAL, "bin" => bin.to_string()).increment(1);
}

pub(crate) fn record_write(bin: &str) {
    counter!(names::CACHE_WRITES_TOTAL, "bin" => bin.to_string()).increment(1);
}

pub(crate) fn record_deletes(bin: &str, count: u64) {
    counter!(names::CACHE_DELETES_TOTAL, "bin" => bin.to_string()).increment(count);
}

pub(crate) fn record_invalidation(bin: &str) {
    counter!(names::CACHE_INVALIDATIONS_TOTAL, "bin" => bin.to_string()).increment(1);
}

pub(crate) fn record_invalidate_all(bin: &str, strategy: &'static str) {
    counter!(
        names::CACHE_INVALIDATE_ALL_TOTAL,
        "bin" => bin.to_string(),
        "strategy" => strategy
    )
    .increment(1);
}

pub(crate) fn record_tag_invalidation() {
    counter!(names::CACHE_TAG_INVALIDATIONS_TOTAL).increment(1);
}
