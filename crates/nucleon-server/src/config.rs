// ============================================
// File: crates/nucleon-server/src/config.rs
// ============================================
//! # Server Configuration
//!
//! ## Creation Reason
//! Provides configuration management for the Nucleon server, supporting
//! TOML files with per-field defaults.
//!
//! ## Configuration Sections
//! - `network`: primary listen port, advertised IP override
//! - `identity`: license key token, project identity variables
//! - `nucleus`: registration endpoint, relay address, timing
//! - `logging`: log level
//!
//! ## Example Configuration
//! ```toml
//! [network]
//! primary_port = 30120
//!
//! [identity]
//! license_key_token = "lk-xxxxxxxxxxxx"
//! project_name = "MyServer"
//! project_desc = "A server with a name"
//!
//! [nucleus]
//! register_url = "https://api.nucleon.network/register/?v=2"
//! relay_addr = "relay.nucleon.network:30130"
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ServerError};

// ============================================
// ServerConfig
// ============================================

/// Main server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Server identity configuration.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Nucleus registration configuration.
    #[serde(default)]
    pub nucleus: NucleusConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or if validation
    /// fails.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if the content cannot be parsed or fails validation.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServerError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.nucleus.validate()?;
        Ok(())
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Primary listen port advertised during registration.
    #[serde(default = "default_primary_port")]
    pub primary_port: u16,

    /// IP override sent with the registration request. Empty lets the
    /// Nucleus endpoint derive the address from the connection.
    #[serde(default)]
    pub ip_override: String,
}

fn default_primary_port() -> u16 {
    30120
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            primary_port: default_primary_port(),
            ip_override: String::new(),
        }
    }
}

impl NetworkConfig {
    /// Validates the network configuration.
    ///
    /// # Errors
    /// Returns error if the primary port is zero.
    pub fn validate(&self) -> Result<()> {
        if self.primary_port == 0 {
            return Err(ServerError::config_invalid(
                "network.primary_port",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

// ============================================
// IdentityConfig
// ============================================

/// Server identity configuration, seeded into the console variable store at
/// startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// License key token identifying this server to the licensing system.
    /// Registration with Nucleus is deferred until this is non-empty.
    #[serde(default)]
    pub license_key_token: String,

    /// Project name shown in the server list.
    #[serde(default)]
    pub project_name: String,

    /// Project description shown in the server list.
    #[serde(default)]
    pub project_desc: String,

    /// Server hostname.
    #[serde(default)]
    pub hostname: String,
}

// ============================================
// NucleusConfig
// ============================================

/// Nucleus registration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NucleusConfig {
    /// Registration endpoint URL.
    #[serde(default = "default_register_url")]
    pub register_url: String,

    /// Relay address for the reverse tunnel, in `host:port` form.
    #[serde(default = "default_relay_addr")]
    pub relay_addr: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Application heartbeat interval driving the controller, in
    /// milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_register_url() -> String {
    "https://api.nucleon.network/register/?v=2".to_string()
}

fn default_relay_addr() -> String {
    "relay.nucleon.network:30130".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_tick_interval() -> u64 {
    500
}

impl Default for NucleusConfig {
    fn default() -> Self {
        Self {
            register_url: default_register_url(),
            relay_addr: default_relay_addr(),
            request_timeout_secs: default_request_timeout(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl NucleusConfig {
    /// Validates the Nucleus configuration.
    ///
    /// # Errors
    /// Returns error describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !self.register_url.starts_with("http://") && !self.register_url.starts_with("https://") {
            return Err(ServerError::config_invalid(
                "nucleus.register_url",
                "must be an http(s) URL",
            ));
        }
        if !self.relay_addr.contains(':') {
            return Err(ServerError::config_invalid(
                "nucleus.relay_addr",
                "must be in host:port form",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ServerError::config_invalid(
                "nucleus.request_timeout_secs",
                "must be > 0",
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ServerError::config_invalid(
                "nucleus.tick_interval_ms",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug").
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================
