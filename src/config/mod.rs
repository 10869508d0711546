//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `ROUNDSYNC` prefix and nested values use double underscores as separators.
//! Every value has a default, so an empty environment yields a local setup.
//!
//! # Example
//!
//! ```no_run
//! use roundsync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Joining rounds at {}", config.connection.ws_url);
//! ```

mod api;
mod auth;
mod connection;
mod error;
mod logging;

pub use api::ApiConfig;
pub use auth::AuthConfig;
pub use connection::ConnectionConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Session connection (endpoint, timings, rollover)
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// HTTP API for stats, history and leaderboard
    #[serde(default)]
    pub api: ApiConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Credential used by the binary
    #[serde(default)]
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `ROUNDSYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `ROUNDSYNC__CONNECTION__WS_URL=wss://...` -> `connection.ws_url`
    /// - `ROUNDSYNC__API__TIMEOUT_SECS=5` -> `api.timeout_secs = 5`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ROUNDSYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.connection.validate()?;
        self.api.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
