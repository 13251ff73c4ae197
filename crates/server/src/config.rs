//! Configuration management for the server binary.
//!
//! This module handles loading, validation, and conversion of server
//! configuration from TOML files and command-line arguments.

use netcore::config::{DEFAULT_TCP_PORT, DEFAULT_TCP_SEND_BUFFER_SIZE, DEFAULT_UDP_PORT};
use netcore::NetworkConfig;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use tracing::info;

/// Default tick interval for serde deserialization
fn default_tick_interval() -> u64 {
    10
}

fn default_health_interval() -> u64 {
    60
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_tcp_port() -> u16 {
    DEFAULT_TCP_PORT
}

fn default_udp_port() -> u16 {
    DEFAULT_UDP_PORT
}

fn default_tcp_send_buffer_size() -> usize {
    DEFAULT_TCP_SEND_BUFFER_SIZE
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network and loop settings
    pub server: ServerSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
///
/// Controls listener binding, socket tuning and the poll loop cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host both listeners bind to (e.g., "0.0.0.0")
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    /// TCP listen port
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
    /// UDP listen port
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    /// SO_SNDBUF for the TCP listener, in bytes
    #[serde(default = "default_tcp_send_buffer_size")]
    pub tcp_send_buffer_size: usize,
    /// Network poll interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Seconds between health reports
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,
}

/// Logging system configuration.
///
/// Controls log output format, levels, and destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
    /// Optional file that receives a plain-text copy of the log
    pub file_path: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            tcp_port: default_tcp_port(),
            udp_port: default_udp_port(),
            tcp_send_buffer_size: default_tcp_send_buffer_size(),
            tick_interval_ms: default_tick_interval(),
            health_interval_secs: default_health_interval(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration into the network layer's configuration.
    pub fn to_network_config(&self) -> NetworkConfig {
        NetworkConfig {
            bind_host: self.server.bind_host.clone(),
            tcp_port: self.server.tcp_port,
            udp_port: self.server.udp_port,
            tcp_send_buffer_size: self.server.tcp_send_buffer_size,
        }
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_host.parse::<IpAddr>().is_err() {
            return Err(format!("Invalid bind host: {}", &self.server.bind_host));
        }

        if self.server.tcp_send_buffer_size == 0 {
            return Err("tcp_send_buffer_size must be greater than 0".to_string());
        }

        if self.server.tcp_send_buffer_size > i32::MAX as usize {
            return Err(format!(
                "tcp_send_buffer_size must not exceed {} bytes",
                i32::MAX
            ));
        }

        if self.server.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be greater than 0".to_string());
        }

        if self.server.health_interval_secs == 0 {
            return Err("health_interval_secs must be greater than 0".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if matches!(&self.logging.file_path, Some(path) if path.trim().is_empty()) {
            return Err("Log file path cannot be empty".to_string());
        }

        Ok(())
    }
}
