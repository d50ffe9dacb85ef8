//! TTL policy.
//!
//! Two durations matter for every entry: the logical expiry the application
//! asked for, and the physical TTL handed to the store. The physical TTL runs
//! `offset` seconds past the logical expiry so allow-invalid reads can still
//! find recently expired entries.

use crate::item::Expiry;
use redbin_config::CacheSettings;
use redbin_core::{RedbinError, RedbinResult};

/// Physical TTL of permanent entries when no setting applies (one year).
pub const LIFETIME_PERM_DEFAULT: u64 = 31_536_000;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Longest physical TTL handed to the store (100 years).
///
/// Redis rejects `EX` values whose millisecond deadline overflows, so
/// far-future expiries are capped here.
pub const MAX_STORAGE_TTL: u64 = 100 * 365 * DAY;

/// Physical lifetime of permanent entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermanentTtl {
    /// Store expires the entry after this many seconds.
    Seconds(u64),
    /// No physical expiry.
    Unbounded,
}

impl PermanentTtl {
    /// Maps a configured number of seconds, zero meaning unbounded.
    #[must_use]
    pub const fn from_secs(seconds: u64) -> Self {
        if seconds == 0 {
            Self::Unbounded
        } else {
            Self::Seconds(seconds)
        }
    }

    /// Returns the TTL in seconds, `None` when unbounded.
    #[must_use]
    pub const fn as_secs(&self) -> Option<u64> {
        match self {
            Self::Seconds(seconds) => Some(*seconds),
            Self::Unbounded => None,
        }
    }
}

impl Default for PermanentTtl {
    fn default() -> Self {
        Self::Seconds(LIFETIME_PERM_DEFAULT)
    }
}

/// One optional provider of the permanent TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermTtlSource<'a> {
    /// Explicit number of seconds.
    Seconds(Option<u64>),
    /// Relative duration expression such as `"1 day + 2 hours"`.
    Expression(Option<&'a str>),
    /// Seconds from the legacy settings table.
    Legacy(Option<u64>),
}

impl PermTtlSource<'_> {
    /// Returns the seconds this source provides, if it is present.
    ///
    /// A present expression that does not parse is an error.
    pub fn seconds(&self) -> RedbinResult<Option<u64>> {
        match self {
            Self::Seconds(value) | Self::Legacy(value) => Ok(*value),
            Self::Expression(Some(expression)) => parse_duration_expression(expression).map(Some),
            Self::Expression(None) => Ok(None),
        }
    }
}

/// Returns the permanent TTL sources of a bin, highest precedence first.
#[must_use]
pub fn sources_for_bin<'a>(settings: &'a CacheSettings, bin: &str) -> [PermTtlSource<'a>; 3] {
    let bin_settings = settings.bins.get(bin);
    [
        PermTtlSource::Seconds(bin_settings.and_then(|s| s.perm_ttl_seconds)),
        PermTtlSource::Expression(bin_settings.and_then(|s| s.perm_ttl_datestring.as_deref())),
        PermTtlSource::Legacy(settings.legacy_perm_ttl(bin)),
    ]
}

/// Resolves the permanent TTL from sources ordered by precedence.
///
/// The first present source wins; later sources are not consulted. With no
/// source present the result is [`LIFETIME_PERM_DEFAULT`].
pub fn resolve_permanent_ttl(sources: &[PermTtlSource<'_>]) -> RedbinResult<PermanentTtl> {
    for source in sources {
        if let Some(seconds) = source.seconds()? {
            return Ok(PermanentTtl::from_secs(seconds));
        }
    }
    Ok(PermanentTtl::default())
}

/// Resolves the permanent TTL of a bin from the cache settings.
pub fn resolve_bin_permanent_ttl(
    settings: &CacheSettings,
    bin: &str,
) -> RedbinResult<PermanentTtl> {
    resolve_permanent_ttl(&sources_for_bin(settings, bin)).map_err(|e| match e {
        RedbinError::Configuration(message) => {
            RedbinError::Configuration(format!("bin '{}': {}", bin, message))
        }
        other => other,
    })
}

/// Parses a relative duration such as `"1 day + 1 hour + 1 minute + 1 second"`.
///
/// Terms are `<count> <unit>` pairs, optionally separated by `+` or `,`.
/// Units may be singular or plural: second/sec, minute/min, hour, day, week,
/// month (30 days) and year (365 days).
pub fn parse_duration_expression(expression: &str) -> RedbinResult<u64> {
    let normalized = expression.replace(['+', ','], " ");
    let mut tokens = normalized.split_whitespace();
    let mut total: u64 = 0;
    let mut terms = 0;

    while let Some(count) = tokens.next() {
        let count: u64 = count.parse().map_err(|_| {
            RedbinError::Configuration(format!(
                "invalid duration '{}': expected a number, found '{}'",
                expression, count
            ))
        })?;
        let unit = tokens.next().ok_or_else(|| {
            RedbinError::Configuration(format!(
                "invalid duration '{}': missing unit after {}",
                expression, count
            ))
        })?;
        let unit_seconds = unit_seconds(unit).ok_or_else(|| {
            RedbinError::Configuration(format!(
                "invalid duration '{}': unknown unit '{}'",
                expression, unit
            ))
        })?;

        total = count
            .checked_mul(unit_seconds)
            .and_then(|seconds| total.checked_add(seconds))
            .ok_or_else(|| {
                RedbinError::Configuration(format!("invalid duration '{}': overflow", expression))
            })?;
        terms += 1;
    }

    if terms == 0 {
        return Err(RedbinError::Configuration(
            "invalid duration: expression is empty".to_string(),
        ));
    }

    Ok(total)
}

fn unit_seconds(unit: &str) -> Option<u64> {
    let unit = unit.to_ascii_lowercase();
    let singular = unit.strip_suffix('s').unwrap_or(&unit);
    match singular {
        "sec" | "second" => Some(1),
        "min" | "minute" => Some(MINUTE),
        "hour" => Some(HOUR),
        "day" => Some(DAY),
        "week" => Some(7 * DAY),
        "month" => Some(30 * DAY),
        "year" => Some(365 * DAY),
        _ => None,
    }
}

/// Physical TTL to apply when writing an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTtl {
    /// Expire after this many seconds (always positive).
    Seconds(u64),
    /// Never expire.
    Unbounded,
    /// The entry is already past its physical lifetime.
    Expired,
}

impl StorageTtl {
    /// Returns the TTL in seconds; `Some(0)` when expired, `None` when unbounded.
    #[must_use]
    pub const fn as_secs(&self) -> Option<u64> {
        match self {
            Self::Seconds(seconds) => Some(*seconds),
            Self::Expired => Some(0),
            Self::Unbounded => None,
        }
    }
}

/// Computes the physical TTL of an entry.
///
/// Permanent entries get the bin's permanent TTL. Time-bounded entries live
/// `max(0, expire - now) + offset` seconds. Both are capped at
/// [`MAX_STORAGE_TTL`].
#[must_use]
pub fn compute_storage_ttl(
    expire: Expiry,
    now: i64,
    offset_secs: u64,
    permanent: PermanentTtl,
) -> StorageTtl {
    match expire {
        Expiry::Permanent => match permanent {
            PermanentTtl::Seconds(seconds) => StorageTtl::Seconds(seconds.min(MAX_STORAGE_TTL)),
            PermanentTtl::Unbounded => StorageTtl::Unbounded,
        },
        Expiry::At(timestamp) => {
            let remaining = u64::try_from(timestamp.saturating_sub(now)).unwrap_or(0);
            match remaining.saturating_add(offset_secs) {
                0 => StorageTtl::Expired,
                seconds => StorageTtl::Seconds(seconds.min(MAX_STORAGE_TTL)),
            }
        }
    }
}

/// TTL settings resolved for one bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    offset_secs: u64,
    permanent: PermanentTtl,
}

impl TtlPolicy {
    /// Creates a policy from a grace offset and a permanent TTL.
    #[must_use]
    pub const fn new(offset_secs: u64, permanent: PermanentTtl) -> Self {
        Self {
            offset_secs,
            permanent,
        }
    }

    /// Resolves the policy of a bin from the cache settings.
    pub fn for_bin(settings: &CacheSettings, bin: &str) -> RedbinResult<Self> {
        Ok(Self::new(
            settings.ttl_offset_secs,
            resolve_bin_permanent_ttl(settings, bin)?,
        ))
    }

    /// Returns the grace offset in seconds.
    #[must_use]
    pub const fn offset_secs(&self) -> u64 {
        self.offset_secs
    }

    /// Returns the permanent TTL.
    #[must_use]
    pub const fn permanent(&self) -> PermanentTtl {
        self.permanent
    }

    /// Computes the physical TTL of an entry written at `now`.
    #[must_use]
    pub fn storage_ttl(&self, expire: Expiry, now: i64) -> StorageTtl {
        compute_storage_ttl(expire, now, self.offset_secs, self.permanent)
    }
}
