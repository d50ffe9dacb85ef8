//! Request clock.
//!
//! Logical expiry is decided against [`Clock::now`], which must be read on
//! every call. Tests swap in a [`TestClock`] to move time forward without
//! touching the system clock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source of the current request time in unix seconds.
pub trait Clock: Send + Sync {
    /// Returns the current time as a unix timestamp in seconds.
    fn now(&self) -> i64;
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock with an adjustable offset on top of a base clock.
///
/// [`advance`](Self::advance) only moves the logical time seen by the cache.
/// When a real Redis server holds the data its own TTLs keep running on wall
/// time, so tests exercising physical expiry must use [`wait`](Self::wait),
/// which also sleeps.
pub struct TestClock {
    base: Arc<dyn Clock>,
    offset: AtomicI64,
}

impl TestClock {
    /// Creates a test clock on top of the system clock with no offset.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base(Arc::new(SystemClock))
    }

    /// Creates a test clock on top of the given base clock.
    #[must_use]
    pub fn with_base(base: Arc<dyn Clock>) -> Self {
        Self {
            base,
            offset: AtomicI64::new(0),
        }
    }

    /// Creates a test clock frozen at the given timestamp.
    #[must_use]
    pub fn fixed(timestamp: i64) -> Self {
        Self::with_base(Arc::new(FixedClock(timestamp)))
    }

    /// Moves the clock forward by `seconds` without sleeping.
    pub fn advance(&self, seconds: i64) {
        self.offset.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Replaces the current offset.
    pub fn set_offset(&self, seconds: i64) {
        self.offset.store(seconds, Ordering::SeqCst);
    }

    /// Returns the current offset.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset.load(Ordering::SeqCst)
    }

    /// Moves the clock forward and really sleeps for the same duration.
    ///
    /// On a frozen base (see [`fixed`](Self::fixed)) logical time then moves
    /// in step with the store's physical TTLs.
    pub async fn wait(&self, seconds: u64) {
        self.advance(i64::try_from(seconds).unwrap_or(i64::MAX));
        tokio::time::sleep(Duration::from_secs(seconds)).await;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> i64 {
        self.base.now() + self.offset()
    }
}

/// Clock that always returns the same timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}
