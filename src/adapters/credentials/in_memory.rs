//! In-memory credential store.
//!
//! Holds the bearer credential for the lifetime of the process. Login flows
//! call `set`; the HTTP adapter calls `invalidate` when the server rejects
//! the token.

use std::sync::RwLock;

use crate::domain::foundation::Credential;
use crate::ports::CredentialProvider;

/// Process-local credential holder.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credential: RwLock<Option<Credential>>,
}

impl InMemoryCredentialStore {
    /// Creates an empty (anonymous) store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given token. Blank tokens mean anonymous.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            credential: RwLock::new(Credential::non_empty(token)),
        }
    }

    /// Creates a store from an optional credential.
    pub fn from_credential(credential: Option<Credential>) -> Self {
        Self {
            credential: RwLock::new(credential),
        }
    }

    /// Replaces the stored credential.
    pub fn set(&self, credential: Credential) {
        *self.write() = Some(credential);
    }

    /// Removes the stored credential.
    pub fn clear(&self) {
        *self.write() = None;
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Credential>> {
        self.credential
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialProvider for InMemoryCredentialStore {
    fn current(&self) -> Option<Credential> {
        self.credential
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn invalidate(&self) {
        self.clear();
    }
}
