//! TOML-based configuration for the Convergence server
//!
//! Every section and every key is optional; a missing `convergence.toml`
//! yields the built-in defaults. `HOST` and `PORT` from the environment
//! (or a `.env` file) override the file.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 3001
//! log_level = "info"
//! log_format = "pretty"
//!
//! [websocket]
//! max_message_size = 1048576
//!
//! [sweep]
//! enabled = true
//! interval_secs = 60
//! completed_round_ttl_secs = 3600
//! peer_idle_timeout_secs = 300
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location looked up when no `--config` is given
pub const DEFAULT_CONFIG_PATH: &str = "convergence.toml";

/// Root configuration structure loaded from convergence.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub websocket: WebSocketConfig,

    #[serde(default)]
    pub sweep: SweepConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Default tracing filter; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

// ============= WebSocket Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// Largest inbound frame accepted, in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

fn default_max_message_size() -> usize {
    1024 * 1024
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
        }
    }
}

// ============= Sweep Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,

    /// How long a completed round stays queryable
    #[serde(default = "default_round_ttl")]
    pub completed_round_ttl_secs: u64,

    /// Evict peers silent for this long. Unset: only dead connections go.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_idle_timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_round_ttl() -> u64 {
    3600
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_sweep_interval(),
            completed_round_ttl_secs: default_round_ttl(),
            peer_idle_timeout_secs: None,
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn round_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.completed_round_ttl_secs.min(i64::MAX as u64) as i64)
    }

    pub fn peer_idle_timeout(&self) -> Option<chrono::Duration> {
        self.peer_idle_timeout_secs
            .map(|secs| chrono::Duration::seconds(secs.min(i64::MAX as u64) as i64))
    }
}

// ============= Errors =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' has an invalid value: {1}")]
    InvalidEnvOverride(String, String),
}

impl ConvergenceConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ConvergenceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file means defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply `HOST` and `PORT` from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnvOverride("PORT".to_string(), port.clone()))?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.host must not be empty".to_string(),
            ));
        }
        if self.websocket.max_message_size == 0 {
            return Err(ConfigError::ValidationError(
                "websocket.max_message_size must be greater than 0".to_string(),
            ));
        }
        if self.sweep.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sweep.interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.sweep.completed_round_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sweep.completed_round_ttl_secs must be greater than 0".to_string(),
            ));
        }
        if self.sweep.peer_idle_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "sweep.peer_idle_timeout_secs must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// The effective configuration, as it would be written to a file.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// `host:port` to bind the listener to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
