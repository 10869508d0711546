//! Credential provider port.
//!
//! The credential is acquired elsewhere (login flow, environment, token
//! file). The session client and the HTTP adapter only read it, and the
//! HTTP adapter invalidates it when the server rejects it.

use crate::domain::foundation::Credential;

/// Source of the current bearer credential.
pub trait CredentialProvider: Send + Sync {
    /// Returns the current credential, or `None` when anonymous.
    fn current(&self) -> Option<Credential>;

    /// Drops the current credential after the server rejected it.
    fn invalidate(&self);
}
