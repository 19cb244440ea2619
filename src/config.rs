//! # Fleet Client Configuration
//!
//! Configuration for the server endpoints, the job timer tracker, artifact
//! downloads and logging.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [server]
//! base_url = "http://printfarm.local:8000/api"
//! socket_url = "ws://printfarm.local:8000/ws"
//! connect_timeout_secs = 2
//! io_timeout_secs = 10
//!
//! [tracker]
//! pause_warnings = [600, 900, 1080]
//! pause_error = 1200
//!
//! [downloads]
//! directory = "downloads"
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Every section and every field is optional; missing values fall back to
//! the defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the fleet client.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote service endpoints and transport timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_socket_url")]
    pub socket_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            socket_url: default_socket_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            io_timeout_secs: default_io_timeout_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

impl ServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// Job timer tracker settings. Thresholds are in paused seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
    #[serde(default = "default_pause_warnings")]
    pub pause_warnings: Vec<u64>,
    #[serde(default = "default_pause_error")]
    pub pause_error: u64,
    /// Stop the timer as soon as the estimate runs out, even while the
    /// printer still reports `printing`.
    #[serde(default)]
    pub stop_on_exhausted: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_millis: default_tick_millis(),
            pause_warnings: default_pause_warnings(),
            pause_error: default_pause_error(),
            stop_on_exhausted: false,
        }
    }
}

impl TrackerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    /// Validate tracker config (tick period, threshold ordering)
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_millis == 0 {
            return Err("Tracker tick_millis must be > 0".to_string());
        }
        if self.pause_warnings.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err("Tracker pause_warnings must be strictly increasing".to_string());
        }
        if let Some(&last) = self.pause_warnings.last() {
            if last >= self.pause_error {
                return Err(format!(
                    "Tracker pause_error ({}) must exceed the last warning ({})",
                    self.pause_error, last
                ));
            }
        }
        Ok(())
    }
}

/// Where fetched job files are written.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    #[serde(default = "default_downloads_directory")]
    pub directory: PathBuf,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            directory: default_downloads_directory(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Result<tracing::Level, ConfigError> {
        self.level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.level)))
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracker.validate().map_err(ConfigError::Invalid)?;
        self.logging.max_level()?;
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("server.base_url is empty".to_string()));
        }
        Ok(())
    }
}

// Default value functions
fn default_base_url() -> String { "http://127.0.0.1:8000/api".to_string() }
fn default_socket_url() -> String { "ws://127.0.0.1:8000/ws".to_string() }
fn default_connect_timeout_secs() -> u64 { 2 }
fn default_io_timeout_secs() -> u64 { 10 }
fn default_reconnect_delay_secs() -> u64 { 3 }
fn default_tick_millis() -> u64 { 1000 }
fn default_pause_warnings() -> Vec<u64> { vec![600, 900, 1080] }
fn default_pause_error() -> u64 { 1200 }
fn default_downloads_directory() -> PathBuf { PathBuf::from("downloads") }
fn default_log_level() -> String { "info".to_string() }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let config: Config = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                return Err(ConfigError::Toml(e));
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    config.validate()?;
    Ok(config)
}
