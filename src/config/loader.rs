use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::StoreOptions;

/// Errors that can occur when loading store options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl StoreOptions {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/statehive/config.toml` on Unix/macOS,
    /// or equivalent on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("statehive").join("config.toml")
    }

    /// Loads options from the default config file.
    ///
    /// If the file doesn't exist, returns `StoreOptions::default()`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(StoreOptions::default());
        }
        Self::load_from(&path)
    }

    /// Loads options from an explicit path. A missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let options: StoreOptions = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        options.validate()?;
        Ok(options)
    }

    /// Parses options from TOML text without touching the filesystem.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: StoreOptions = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            source: e,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Validates the options.
    ///
    /// Strict mode relies on the diagnostics log to surface violations, so
    /// it cannot be combined with a zero-capacity log.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strict && self.diagnostics_capacity == 0 {
            return Err(ConfigError::ValidationError {
                message: "strict mode requires diagnostics_capacity > 0".to_string(),
            });
        }
        Ok(())
    }
}
