//! Configuration management for logbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use logbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `LOGBOX__<section>__<key>`
//!
//! Examples:
//! - `LOGBOX__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `LOGBOX__CACHE__DEFAULT_TTL=1m`
//! - `LOGBOX__DELIVERY__JOB_LOG_TOKEN_THRESHOLD=20000`
//!
//! The Buildkite API token is read from `BUILDKITE_API_TOKEN` only, and the
//! older `JOB_LOG_TOKEN_THRESHOLD` variable is still honoured.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/logbox.toml`.
//! This can be overridden using the `LOGBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::{ByteSize, HumanDuration};
pub use models::{
    CacheConfig, Config, DeliveryConfig, QueryConfig, ServerConfig, SourceConfig, SourceProvider,
};
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
    /// 1. Environment variables (`LOGBOX__*`, `BUILDKITE_API_TOKEN`, `JOB_LOG_TOKEN_THRESHOLD`)
    /// 2. TOML file (default: `config/logbox.toml`)
    /// 3. Default values
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
