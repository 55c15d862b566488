//! Configuration loading.
//!
//! A small TOML surface: daemon identity plus the device-link transport
//! settings. Every field has a default so an empty file (or a missing
//! section) still yields a runnable daemon.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Daemon identity.
    #[serde(default)]
    pub server: ServerConfig,
    /// Device-link transport settings.
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Daemon identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name reported in logs (e.g., "applink.head-unit").
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Prometheus metrics HTTP port; the endpoint is disabled when unset.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            metrics_port: None,
        }
    }
}

fn default_server_name() -> String {
    "applinkd".to_string()
}

/// Device-link transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Address device links connect out to (the adapter peer).
    #[serde(default = "default_device_addr")]
    pub device_addr: String,
    /// Per-connection establishment timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            device_addr: default_device_addr(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

fn default_device_addr() -> String {
    "127.0.0.1:12345".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    3000
}
