//! Opaque bearer credential supplied by the auth collaborator.

use secrecy::{ExposeSecret, Secret};

/// Bearer token forwarded to the session server and the HTTP API.
///
/// The client never inspects or mutates the token. `Debug` output is
/// redacted by `secrecy`.
#[derive(Debug, Clone)]
pub struct Credential(Secret<String>);

impl Credential {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(Secret::new(token.into()))
    }

    /// Wraps a token, treating blank input as "no credential".
    pub fn non_empty(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self::new(token))
        }
    }

    /// Exposes the raw token for the wire.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Compares two credentials without exposing them to callers.
    pub fn same_as(&self, other: &Credential) -> bool {
        self.expose() == other.expose()
    }
}

impl From<Secret<String>> for Credential {
    fn from(secret: Secret<String>) -> Self {
        Self(secret)
    }
}
