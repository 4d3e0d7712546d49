//! Configuration module for the callrelay server
//!
//! This module handles server configuration from various sources: YAML files and
//! environment variables. The configuration is split into logical submodules:
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `realtime`: Voice-AI session settings
//! - `relay`: Per-call relay engine settings
//! - `twilio`: Telephony provider settings
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use callrelay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file merged with environment variables
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
mod realtime;
mod relay;
mod twilio;
mod utils;
mod validation;
mod yaml;

pub use realtime::RealtimeConfig;
pub use relay::RelaySettings;
pub use twilio::TwilioConfig;

/// Server configuration
///
/// Contains everything needed to run the relay server:
/// - Server settings (host, port, public host used in TwiML stream URLs)
/// - Voice-AI session settings
/// - Relay engine settings (drain delay, control markers)
/// - Telephony provider settings and follow-up actions
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Externally reachable hostname; falls back to the request `Host` header
    pub public_host: Option<String>,

    // Voice-AI session
    pub realtime: RealtimeConfig,

    // Relay engine
    pub relay: RelaySettings,

    // Telephony provider
    pub twilio: TwilioConfig,

    // External intake for structured booking data
    pub booking_form_url: Option<String>,

    // Recorded calls shorter than this get a follow-up message
    pub short_call_threshold_seconds: u64,
}

impl ServerConfig {
    /// Load configuration from a YAML file merged with environment variables
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables
    /// 3. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // The YAML file is the source of truth here, so .env is not loaded;
        // only real environment variables fill the gaps.
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_config(&config)?;

        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check whether outbound call-control requests can be issued
    pub fn has_twilio_api(&self) -> bool {
        self.twilio.has_api_credentials()
    }
}
