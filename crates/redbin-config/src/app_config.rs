//! Application configuration structures.

use redbin_core::telemetry::TracingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Environment name (development, staging, production).
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Cache backend settings.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Redis connection settings.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Logging settings.
    #[serde(default)]
    pub observability: TracingConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            cache: CacheSettings::default(),
            redis: RedisConfig::default(),
            observability: TracingConfig::default(),
        }
    }
}

/// Cache backend settings shared by every bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Namespace prepended to every key written by the backend.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Seconds the store keeps an entry after its logical expiry.
    ///
    /// Allow-invalid reads can still see the entry during this window.
    /// Zero makes physical and logical expiry coincide.
    #[serde(default = "default_ttl_offset")]
    pub ttl_offset_secs: u64,

    /// Use the delete strategy for `invalidate_all` instead of marking.
    #[serde(default)]
    pub invalidate_all_as_delete: bool,

    /// Per-bin permanent TTL settings, keyed by bin name.
    #[serde(default)]
    pub bins: HashMap<String, BinSettings>,

    /// Legacy settings table. Only `perm_ttl_<bin>` entries are read.
    #[serde(default)]
    pub legacy: HashMap<String, u64>,
}

fn default_key_prefix() -> String {
    "redbin".to_string()
}

fn default_ttl_offset() -> u64 {
    3
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            ttl_offset_secs: default_ttl_offset(),
            invalidate_all_as_delete: false,
            bins: HashMap::new(),
            legacy: HashMap::new(),
        }
    }
}

impl CacheSettings {
    /// Returns the grace window as a Duration.
    #[must_use]
    pub const fn ttl_offset(&self) -> Duration {
        Duration::from_secs(self.ttl_offset_secs)
    }

    /// Returns the settings for a bin, empty when the bin is not configured.
    #[must_use]
    pub fn bin(&self, bin: &str) -> BinSettings {
        self.bins.get(bin).cloned().unwrap_or_default()
    }

    /// Returns the legacy permanent TTL for a bin, if one is set.
    #[must_use]
    pub fn legacy_perm_ttl(&self, bin: &str) -> Option<u64> {
        self.legacy.get(&format!("perm_ttl_{}", bin)).copied()
    }

    /// Sets an explicit permanent TTL for a bin.
    #[must_use]
    pub fn with_perm_ttl_seconds(mut self, bin: &str, seconds: u64) -> Self {
        self.bins.entry(bin.to_string()).or_default().perm_ttl_seconds = Some(seconds);
        self
    }

    /// Sets a relative duration expression as the permanent TTL of a bin.
    #[must_use]
    pub fn with_perm_ttl_datestring(mut self, bin: &str, expression: impl Into<String>) -> Self {
        self.bins.entry(bin.to_string()).or_default().perm_ttl_datestring =
            Some(expression.into());
        self
    }

    /// Sets the legacy permanent TTL of a bin.
    #[must_use]
    pub fn with_legacy_perm_ttl(mut self, bin: &str, seconds: u64) -> Self {
        self.legacy.insert(format!("perm_ttl_{}", bin), seconds);
        self
    }
}

/// Per-bin settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BinSettings {
    /// Permanent TTL in seconds. Zero disables physical expiry.
    #[serde(default)]
    pub perm_ttl_seconds: Option<u64>,

    /// Permanent TTL as a relative duration, e.g. `"1 day + 1 hour"`.
    #[serde(default)]
    pub perm_ttl_datestring: Option<String>,
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL.
    pub url: String,
    /// Connection pool size.
    pub pool_size: usize,
    /// Enable Redis (can be disabled for local development).
    pub enabled: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            enabled: true,
        }
    }
}
