//! Credential configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use crate::domain::foundation::Credential;

/// Credential configuration for the binary
///
/// The library never reads this; callers pass credentials explicitly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Bearer token; anonymous when absent
    #[serde(default)]
    pub token: Option<Secret<String>>,
}

impl AuthConfig {
    /// The configured credential, if any. Blank tokens count as none.
    pub fn credential(&self) -> Option<Credential> {
        self.token
            .as_ref()
            .and_then(|token| Credential::non_empty(token.expose_secret().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_token_is_anonymous() {
        assert!(AuthConfig::default().credential().is_none());
    }

    #[test]
    fn test_blank_token_is_anonymous() {
        let config = AuthConfig {
            token: Some(Secret::new("   ".to_string())),
        };
        assert!(config.credential().is_none());
    }

    #[test]
    fn test_token_becomes_credential() {
        let config = AuthConfig {
            token: Some(Secret::new("abc".to_string())),
        };
        assert_eq!(config.credential().unwrap().expose(), "abc");
    }
}
