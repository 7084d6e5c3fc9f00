//! Daemon configuration loaded from a TOML file

use std::path::{Path, PathBuf};
use std::time::Duration;

use lyrc_engine::{EngineConfig, EngineConfigError};
use lyrc_sim::VirtualConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid [engine] settings in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: EngineConfigError,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    pub server: ServerConfig,
    pub pigpio: PigpioConfig,
    pub engine: EngineConfig,
    pub remotes: RemotesConfig,
    /// Used instead of pigpio with `--simulate`
    pub simulator: VirtualConfig,
    pub logging: LoggingConfig,
}

/// Client-facing listener
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_address: String,
    pub listen_port: u16,
    /// Seconds the engine stays up after a client disconnects
    pub keep_alive_secs: u64,
}

impl ServerConfig {
    /// `address:port` to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.listen_port)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            listen_port: 7059,
            keep_alive_secs: 300,
        }
    }
}

/// pigpio daemon connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PigpioConfig {
    pub host: String,
    pub port: u16,
}

impl Default for PigpioConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8888,
        }
    }
}

/// Where remote definitions live
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemotesConfig {
    pub path: PathBuf,
}

impl Default for RemotesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/etc/lirc"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log at debug level
    pub verbose: bool,
}

impl DaemonConfig {
    /// Parse and validate a configuration document
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config
            .engine
            .validate()
            .map_err(|source| ConfigError::Invalid {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(config)
    }

    /// Load `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Default configuration as TOML
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }
}
