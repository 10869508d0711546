//! Error types for the domain layer.

use thiserror::Error;

/// Errors that occur during value object construction or state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64, actual: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failures surfaced to session subscribers.
///
/// None of these are fatal: the channel stays open (or reconnects on its own)
/// and the last known snapshot is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Socket-level failure. A reconnect is scheduled automatically.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An inbound frame could not be decoded. The frame is dropped.
    #[error("Malformed message: {reason}")]
    MalformedMessage { reason: String },

    /// The server sent an `error` envelope.
    #[error("Server error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Creates a transport error.
    pub fn transport(reason: impl Into<String>) -> Self {
        ClientError::Transport(reason.into())
    }

    /// Creates a malformed message error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        ClientError::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Creates a protocol error from a server message.
    pub fn protocol(message: impl Into<String>) -> Self {
        ClientError::Protocol(message.into())
    }

    /// Stable machine-readable code for UI mapping.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Transport(_) => "TRANSPORT_ERROR",
            ClientError::MalformedMessage { .. } => "MALFORMED_MESSAGE",
            ClientError::Protocol(_) => "PROTOCOL_ERROR",
        }
    }
}
