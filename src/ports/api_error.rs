//! Errors returned by the read-side API ports.

use thiserror::Error;

/// Failures of an HTTP read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// The server rejected the credential (401/403).
    #[error("Not authorized")]
    Unauthorized,

    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Unauthorized | ApiError::Decode(_) => false,
        }
    }
}
