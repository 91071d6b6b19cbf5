//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or does not match the schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Backend name not recognized
    #[error("Unknown backend '{0}'; expected one of: atlas, cms")]
    UnknownBackend(String),

    /// Config parsed but is inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Specialized Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Create an invalid-configuration error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
