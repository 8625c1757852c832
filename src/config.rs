//! Application configuration.
//!
//! Loaded from a YAML file with serde defaults; the binary layers CLI and
//! environment overrides on top (CLI > env > file).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default control-plane bind address.
const DEFAULT_BIND: &str = "127.0.0.1";

/// Default control-plane port.
const DEFAULT_PORT: u16 = 9999;

/// Default store directory.
const DEFAULT_STORE_DIR: &str = "data";

/// Default store channel capacity.
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Control-plane server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (default: "127.0.0.1").
    pub bind: String,
    /// Port (default: 9999).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Persistence store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the registry mirror and result logs (default: "data").
    pub dir: String,
    /// MPSC channel capacity for the writer actor (default: 1024).
    pub channel_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: DEFAULT_STORE_DIR.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.is_empty() {
            return Err(ConfigError::Invalid(
                "server.bind must not be empty".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid(
                "server.port must be non-zero".to_string(),
            ));
        }
        if self.store.dir.is_empty() {
            return Err(ConfigError::Invalid(
                "store.dir must not be empty".to_string(),
            ));
        }
        if self.store.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "store.channel_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
