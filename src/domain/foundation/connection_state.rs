//! Connection state of the session channel.

use std::fmt;

/// Lifecycle of the persistent connection.
///
/// Owned by the transport channel; everything else only observes it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The last connection attempt failed. A retry is pending.
    Error(String),
}

impl ConnectionState {
    /// Returns true when commands can be sent.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Returns true while the UI should show a "connecting" indicator.
    pub fn is_pending(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Error(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}
