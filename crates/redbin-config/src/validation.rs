//! Configuration validation.
//!
//! Structural checks run when configuration is loaded so that mistakes show
//! up at startup instead of as confusing cache behaviour later. Every error
//! is collected before reporting.

use crate::{AppConfig, CacheSettings, RedisConfig};
use redbin_core::telemetry::TracingConfig;
use std::fmt;
use url::Url;

/// Characters that may not appear in bin names or the key prefix.
///
/// `:` separates key segments; the others are glob metacharacters that would
/// break bin-wide key patterns.
pub const RESERVED_KEY_CHARS: &[char] = &[':', '*', '?', '[', ']', '\\'];

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Key prefix is empty or contains reserved characters.
    InvalidKeyPrefix { value: String },
    /// Bin name is empty or contains reserved characters.
    InvalidBinName { bin: String },
    /// Both an explicit TTL and a date string are set for one bin.
    AmbiguousPermTtl { bin: String },
    /// Date string is blank.
    EmptyDateString { bin: String },
    /// Redis URL is invalid.
    InvalidRedisUrl { message: String },
    /// Pool size must be positive.
    InvalidPoolSize { value: usize },
    /// Log filter is empty.
    EmptyLogLevel,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeyPrefix { value } => {
                write!(
                    f,
                    "Invalid key prefix '{}': must be non-empty without ':' or glob characters",
                    value
                )
            }
            Self::InvalidBinName { bin } => {
                write!(
                    f,
                    "Invalid bin name '{}': must be non-empty without ':' or glob characters",
                    bin
                )
            }
            Self::AmbiguousPermTtl { bin } => {
                write!(
                    f,
                    "Bin '{}' sets both perm_ttl_seconds and perm_ttl_datestring; perm_ttl_seconds wins",
                    bin
                )
            }
            Self::EmptyDateString { bin } => {
                write!(f, "Bin '{}' has an empty perm_ttl_datestring", bin)
            }
            Self::InvalidRedisUrl { message } => write!(f, "Invalid Redis URL: {}", message),
            Self::InvalidPoolSize { value } => {
                write!(f, "Invalid Redis pool size: {} (must be positive)", value)
            }
            Self::EmptyLogLevel => write!(f, "Log level must not be empty"),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

impl ConfigValidationError {
    /// Returns true if the error only deserves a warning.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::AmbiguousPermTtl { .. })
    }
}

/// Returns true if `name` can be used as a bin name.
#[must_use]
pub fn is_valid_bin_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(RESERVED_KEY_CHARS)
}

/// Validation result collecting errors.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration, warnings included.
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_cache(&config.cache, &mut result);
        Self::validate_redis(&config.redis, &mut result);
        Self::validate_observability(&config.observability, &mut result);

        result
    }

    fn validate_cache(config: &CacheSettings, result: &mut ValidationResult) {
        if !is_valid_bin_name(&config.key_prefix) {
            result.add_error(ConfigValidationError::InvalidKeyPrefix {
                value: config.key_prefix.clone(),
            });
        }

        let mut bins: Vec<_> = config.bins.iter().collect();
        bins.sort_by(|a, b| a.0.cmp(b.0));

        for (bin, settings) in bins {
            if !is_valid_bin_name(bin) {
                result.add_error(ConfigValidationError::InvalidBinName { bin: bin.clone() });
            }
            if let Some(expression) = &settings.perm_ttl_datestring {
                if expression.trim().is_empty() {
                    result.add_error(ConfigValidationError::EmptyDateString { bin: bin.clone() });
                }
                if settings.perm_ttl_seconds.is_some() {
                    result.add_error(ConfigValidationError::AmbiguousPermTtl { bin: bin.clone() });
                }
            }
        }
    }

    fn validate_redis(config: &RedisConfig, result: &mut ValidationResult) {
        if !config.enabled {
            return;
        }

        match Url::parse(&config.url) {
            Ok(url) if matches!(url.scheme(), "redis" | "rediss" | "redis+unix" | "unix") => {}
            Ok(url) => result.add_error(ConfigValidationError::InvalidRedisUrl {
                message: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => result.add_error(ConfigValidationError::InvalidRedisUrl {
                message: e.to_string(),
            }),
        }

        if config.pool_size == 0 {
            result.add_error(ConfigValidationError::InvalidPoolSize {
                value: config.pool_size,
            });
        }
    }

    fn validate_observability(config: &TracingConfig, result: &mut ValidationResult) {
        if config.log_level.trim().is_empty() {
            result.add_error(ConfigValidationError::EmptyLogLevel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::validate(&AppConfig::default());
        assert!(result.is_valid(), "{:?}", result.errors());
    }

    #[test]
    fn test_bin_name_rules() {
        assert!(is_valid_bin_name("render"));
        assert!(is_valid_bin_name("cache_page-2"));
        assert!(!is_valid_bin_name(""));
        assert!(!is_valid_bin_name("a:b"));
        assert!(!is_valid_bin_name("all*"));
        assert!(!is_valid_bin_name("x[1]"));
    }

    #[test]
    fn test_invalid_key_prefix() {
        let mut config = AppConfig::default();
        config.cache.key_prefix = "app:cache".to_string();
        let errors = ConfigValidator::validate(&config).into_result().unwrap_err();
        assert_eq!(
            errors,
            vec![ConfigValidationError::InvalidKeyPrefix {
                value: "app:cache".to_string()
            }]
        );
    }

    #[test]
    fn test_invalid_bin_and_empty_datestring() {
        let mut config = AppConfig::default();
        config.cache = config
            .cache
            .with_perm_ttl_seconds("bad*bin", 10)
            .with_perm_ttl_datestring("page", "  ");
        let errors = ConfigValidator::validate(&config).into_result().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ConfigValidationError::InvalidBinName {
            bin: "bad*bin".to_string()
        }));
        assert!(errors.contains(&ConfigValidationError::EmptyDateString {
            bin: "page".to_string()
        }));
    }

    #[test]
    fn test_ambiguous_perm_ttl_is_warning() {
        let mut config = AppConfig::default();
        config.cache = config
            .cache
            .with_perm_ttl_seconds("page", 10)
            .with_perm_ttl_datestring("page", "1 day");
        let result = ConfigValidator::validate(&config);
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].is_warning());
    }

    #[test]
    fn test_invalid_redis_url() {
        let mut config = AppConfig::default();
        config.redis.url = "http://localhost:6379".to_string();
        config.redis.pool_size = 0;
        let errors = ConfigValidator::validate(&config).into_result().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("unsupported scheme 'http'"));
        assert_eq!(errors[1], ConfigValidationError::InvalidPoolSize { value: 0 });
    }

    #[test]
    fn test_disabled_redis_skips_url_checks() {
        let mut config = AppConfig::default();
        config.redis.enabled = false;
        config.redis.url = "not a url".to_string();
        assert!(ConfigValidator::validate(&config).is_valid());
    }

    #[test]
    fn test_empty_log_level() {
        let mut config = AppConfig::default();
        config.observability.log_level = String::new();
        let errors = ConfigValidator::validate(&config).into_result().unwrap_err();
        assert_eq!(errors, vec![ConfigValidationError::EmptyLogLevel]);
    }
}
