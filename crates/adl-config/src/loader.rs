//! Loading configuration from TOML files and the environment

use crate::config::{BackendKind, CompilerConfig};
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable that overrides the configured backend
pub const BACKEND_ENV_VAR: &str = "ADLC_BACKEND";

/// Loads [`CompilerConfig`] values
pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> ConfigResult<CompilerConfig> {
        if content.trim().is_empty() {
            return Ok(CompilerConfig::default());
        }
        let config: CompilerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<CompilerConfig> {
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Default config path: `$XDG_CONFIG_HOME/adlc/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            })
            .join("adlc")
            .join("config.toml")
    }

    /// Load from an explicit path, else from the default path if it
    /// exists, else defaults. Environment overrides apply in every case.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<CompilerConfig> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::load_from_file(&default)?
                } else {
                    debug!("No config file at {}, using defaults", default.display());
                    CompilerConfig::default()
                }
            }
        };
        Self::apply_overrides(&mut config, |key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment-style overrides through `lookup`
    pub fn apply_overrides<F>(config: &mut CompilerConfig, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(BACKEND_ENV_VAR) {
            let backend: BackendKind = value.parse()?;
            if backend != config.backend {
                info!("{} overrides backend: {} -> {}", BACKEND_ENV_VAR, config.backend, backend);
                config.backend = backend;
            }
        }
        Ok(())
    }
}
