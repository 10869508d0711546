//! HTTP API configuration

use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::http::HttpApiConfig;

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the user API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Settings for the HTTP adapter
    pub fn http_config(&self) -> HttpApiConfig {
        HttpApiConfig::new(self.base_url.clone()).with_timeout(self.timeout())
    }

    /// Validate API configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ValidationError::InvalidApiUrl(e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValidationError::InvalidApiUrl(format!(
                "scheme must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/user/".to_string()
}

fn default_timeout() -> u64 {
    10
}
