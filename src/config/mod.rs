//! Configuration
//!
//! Explicit, validated configuration loading for the remoting core. Values
//! come from an optional configuration file merged with `REMOTING_`-prefixed
//! environment overrides; every field has a usable default so a bare process
//! starts without any configuration at all.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use remoting_core::config::RemotingConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RemotingConfig::load()?;
//! let queue = config.worker_pool.queue_capacity;
//! # let _ = queue;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use crate::execution::worker_pool::WorkerPoolConfig;

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Root configuration for a remoting instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemotingConfig {
    /// Sizing of the shared default worker pool.
    pub worker_pool: WorkerPoolConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RemotingConfig {
    /// Load configuration from `remoting.*` in the working directory (if
    /// present) plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit file plus environment overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::from(path.to_path_buf())),
            None => builder.add_source(File::with_name("remoting").required(false)),
        };
        let settings = builder
            .add_source(Environment::with_prefix("REMOTING").separator("__"))
            .build()?;
        let config: RemotingConfig = settings.try_deserialize()?;

        debug!(
            "configuration loaded: {}",
            serde_json::to_string(&config).unwrap_or_else(|_| "[serialization error]".to_string())
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_sizing() {
        let config = RemotingConfig::default();
        assert_eq!(config.worker_pool.core_workers, 20);
        assert_eq!(config.worker_pool.max_workers, 400);
        assert_eq!(config.worker_pool.queue_capacity, 600);
        assert_eq!(config.worker_pool.keep_alive_ms, 60_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_without_file_yields_defaults() {
        let config = RemotingConfig::load().expect("load succeeds without a file");
        assert_eq!(config.worker_pool, WorkerPoolConfig::default());
    }
}
