//! Configuration module for the gateway server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable readers
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use policy_voice_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use merge::{
    DEFAULT_CREDENTIAL_TIMEOUT_SECONDS, DEFAULT_HOST, DEFAULT_IDLE_TIMEOUT_SECONDS, DEFAULT_PORT,
};

use crate::core::realtime::HandshakeProfileKind;
use crate::core::realtime::openai::{
    DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_SESSIONS_URL, OPENAI_REALTIME_URL,
};
use crate::core::store::DEFAULT_AUDIT_CAPACITY;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway:
/// - Server settings (host, port, TLS)
/// - Upstream realtime settings (API key, model, voice, endpoints, handshake profile)
/// - Reference data settings (seed file, audit capacity)
/// - Security settings (CORS, rate limiting, connection limits)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Upstream realtime settings
    /// OpenAI API key; a missing key fails each session, not startup
    pub openai_api_key: Option<String>,
    pub realtime_model: String,
    pub realtime_voice: String,
    /// Realtime WebSocket endpoint (ws or wss)
    pub realtime_url: String,
    /// Client secret endpoint (http or https)
    pub realtime_sessions_url: String,
    pub credential_timeout_seconds: u64,
    pub handshake_profile: HandshakeProfileKind,
    /// Replaces the preset's built-in instructions when set
    pub instructions_path: Option<PathBuf>,
    pub greeting_enabled: bool,
    /// Session closes after this long without a frame on either side
    pub idle_timeout_seconds: u64,

    // Reference data
    /// Seed file; None uses the built-in seed
    pub data_path: Option<PathBuf>,
    pub audit_log_capacity: usize,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,

    // Connection limits
    /// Maximum concurrent WebSocket connections
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

/// Zeroize secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: None,
            openai_api_key: None,
            realtime_model: DEFAULT_REALTIME_MODEL.to_string(),
            realtime_voice: merge::DEFAULT_VOICE.to_string(),
            realtime_url: OPENAI_REALTIME_URL.to_string(),
            realtime_sessions_url: OPENAI_REALTIME_SESSIONS_URL.to_string(),
            credential_timeout_seconds: DEFAULT_CREDENTIAL_TIMEOUT_SECONDS,
            handshake_profile: HandshakeProfileKind::default(),
            instructions_path: None,
            greeting_enabled: true,
            idle_timeout_seconds: DEFAULT_IDLE_TIMEOUT_SECONDS,
            data_path: None,
            audit_log_capacity: DEFAULT_AUDIT_CAPACITY,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: merge::DEFAULT_RATE_LIMIT_RPS,
            rate_limit_burst_size: merge::DEFAULT_RATE_LIMIT_BURST,
            max_websocket_connections: None,
            max_connections_per_ip: merge::DEFAULT_MAX_CONNECTIONS_PER_IP,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and defaults
    ///
    /// The .env file is loaded in main.rs before this is called, so its
    /// values are visible here as ordinary environment variables.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    pub fn credential_timeout(&self) -> Duration {
        Duration::from_secs(self.credential_timeout_seconds)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}
