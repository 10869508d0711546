//! Session connection configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::channel::parse_ws_url;
use crate::application::{ChannelConfig, ClientConfig, DEFAULT_WS_URL};

/// Session connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Session server endpoint (`ws://` or `wss://`)
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Fixed delay between reconnect attempts, in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Heartbeat period, in milliseconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,

    /// Delay between a round result and the next-round poll, in milliseconds
    #[serde(default = "default_post_outcome_poll_delay")]
    pub post_outcome_poll_delay_ms: u64,

    /// Request a rollover when the countdown expires
    #[serde(default = "default_auto_rollover")]
    pub auto_rollover: bool,
}

impl ConnectionConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn post_outcome_poll_delay(&self) -> Duration {
        Duration::from_millis(self.post_outcome_poll_delay_ms)
    }

    /// Settings for a `SessionClient`
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            channel: ChannelConfig::new(self.ws_url.clone())
                .with_reconnect_delay(self.reconnect_delay())
                .with_heartbeat_interval(self.heartbeat_interval())
                .with_post_outcome_poll_delay(self.post_outcome_poll_delay()),
            auto_rollover: self.auto_rollover,
        }
    }

    /// Validate connection configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        parse_ws_url(&self.ws_url).map_err(|e| ValidationError::InvalidWsUrl(e.to_string()))?;
        if self.reconnect_delay_ms == 0 {
            return Err(ValidationError::InvalidInterval("reconnect_delay_ms"));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ValidationError::InvalidInterval("heartbeat_interval_ms"));
        }
        if self.post_outcome_poll_delay_ms == 0 {
            return Err(ValidationError::InvalidInterval("post_outcome_poll_delay_ms"));
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            reconnect_delay_ms: default_reconnect_delay(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            post_outcome_poll_delay_ms: default_post_outcome_poll_delay(),
            auto_rollover: default_auto_rollover(),
        }
    }
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

fn default_reconnect_delay() -> u64 {
    2000
}

fn default_heartbeat_interval() -> u64 {
    1000
}

fn default_post_outcome_poll_delay() -> u64 {
    5000
}

fn default_auto_rollover() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.ws_url, "ws://localhost:8000/ws/game/");
        assert_eq!(config.reconnect_delay(), Duration::from_secs(2));
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(1));
        assert_eq!(config.post_outcome_poll_delay(), Duration::from_secs(5));
        assert!(config.auto_rollover);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_config_carries_timings() {
        let config = ConnectionConfig {
            reconnect_delay_ms: 500,
            auto_rollover: false,
            ..Default::default()
        };
        let client = config.client_config();
        assert_eq!(client.channel.reconnect_delay, Duration::from_millis(500));
        assert_eq!(client.channel.heartbeat_interval, Duration::from_secs(1));
        assert!(!client.auto_rollover);
    }

    #[test]
    fn test_http_url_is_rejected() {
        let config = ConnectionConfig {
            ws_url: "http://localhost:8000/ws/game/".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidWsUrl(_))
        ));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let config = ConnectionConfig {
            heartbeat_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidInterval("heartbeat_interval_ms"))
        );
    }
}
