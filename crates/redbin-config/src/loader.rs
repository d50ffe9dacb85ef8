//! Configuration loader with layered sources.

use crate::{AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File};
use redbin_core::RedbinError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Environment variable selecting the environment-specific file.
pub const ENVIRONMENT_VAR: &str = "REDBIN_ENVIRONMENT";

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `{config_dir}/default.toml` - Default values
    /// 2. `{config_dir}/{environment}.toml` - Environment-specific overrides
    /// 3. `{config_dir}/local.toml` - Local overrides
    /// 4. Environment variables with `REDBIN__` prefix
    pub fn new(config_dir: impl Into<String>) -> Result<Self, RedbinError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    ///
    /// Backends built earlier keep the values they resolved at construction.
    pub async fn reload(&self) -> Result<(), RedbinError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Loads configuration from the specified directory.
    ///
    /// The environment is taken from `REDBIN_ENVIRONMENT`, defaulting to
    /// `development`.
    pub fn load_config(config_dir: &str) -> Result<AppConfig, RedbinError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());
        Self::load_config_for(config_dir, &environment)
    }

    /// Loads configuration for an explicit environment.
    ///
    /// The reported `environment` is always the one selected here; no file
    /// or variable can override it.
    pub fn load_config_for(config_dir: &str, environment: &str) -> Result<AppConfig, RedbinError> {
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment, "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder
            .add_source(
                Environment::with_prefix("REDBIN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override("environment", environment)
            .map_err(config_error_to_redbin_error)?;

        let app_config: AppConfig = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error_to_redbin_error)?;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Fails on validation errors and logs warnings.
    fn validate_config(config: &AppConfig) -> Result<(), RedbinError> {
        let result = ConfigValidator::validate(config);
        let mut failures = Vec::new();

        for error in result.errors() {
            if error.is_warning() {
                warn!("{}", error);
            } else {
                failures.push(error.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RedbinError::Configuration(failures.join("; ")))
        }
    }
}

fn config_error_to_redbin_error(err: ConfigError) -> RedbinError {
    RedbinError::Configuration(err.to_string())
}
