//! Transport port for the persistent session connection.
//!
//! A `Connector` opens one physical connection and hands back a
//! `Transport`. The transport channel owns the transport exclusively and
//! drives it from a single background task, so implementations need no
//! internal synchronization.
//!
//! # Contract
//!
//! - `recv` returns `None` once the peer closed the connection cleanly
//! - `recv` must be cancel-safe: it is polled inside `tokio::select!`
//! - `close` is best effort and may be called on an already-broken transport

use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a transport or connector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Connection closed")]
    Closed,
}

/// One open bidirectional text-frame connection.
#[async_trait]
pub trait Transport: Send {
    /// Sends one text frame.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Waits for the next text frame.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Closes the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to the given URL, which already carries any credential.
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_reason() {
        assert_eq!(
            TransportError::Connect("refused".into()).to_string(),
            "Connection failed: refused"
        );
        assert_eq!(TransportError::Closed.to_string(), "Connection closed");
    }
}
