//! Configuration management for resultbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use resultbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Result store backend: {:?}", config.store.backend);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `RESULTBOX__<section>__<key>`
//!
//! Examples:
//! - `RESULTBOX__STORE__ADDRS=redis.internal:6379`
//! - `RESULTBOX__RESULTS__EXPIRY=24h`
//! - `RESULTBOX__RESULTS__PIPE_PERIOD=100ms`
//!
//! The Redis password is only read from `RESULTBOX_REDIS_PASSWORD` (or
//! `REDIS_PASSWORD`).
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/resultbox.toml`.
//! This can be overridden using the `RESULTBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{Config, ResultsConfig, StoreBackend, StoreConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`RESULTBOX__*`)
    /// 2. TOML file (default: `config/resultbox.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (missing endpoint, zero timeouts, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
