//! Credential management for signed API requests.

use secrecy::{ExposeSecret, SecretString};

use crate::error::ExchangeError;

/// API credentials containing the key and secret.
///
/// Both parts are required: an empty key or secret is rejected at
/// construction time so that a misconfigured client fails before its first
/// request rather than during one.
#[derive(Clone)]
pub struct Credentials {
    /// The API key (public identifier)
    pub api_key: String,
    /// The API secret (private, used for signing)
    api_secret: SecretString,
}

impl Credentials {
    /// Create new credentials from an API key and secret.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::MissingCredentials`] when either part is
    /// empty.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self, ExchangeError> {
        let api_key = api_key.into();
        let api_secret = api_secret.into();
        if api_key.is_empty() || api_secret.is_empty() {
            return Err(ExchangeError::MissingCredentials);
        }
        Ok(Self {
            api_key,
            api_secret: SecretString::from(api_secret),
        })
    }

    /// Get the API secret for signing.
    ///
    /// This method exposes the secret - use carefully.
    pub fn expose_secret(&self) -> &str {
        self.api_secret.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = Credentials::new("my_key", "super_secret").unwrap();
        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("my_key"));
        assert!(!debug_str.contains("super_secret"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let result = Credentials::new("", "secret");
        assert!(matches!(result, Err(ExchangeError::MissingCredentials)));
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let result = Credentials::new("key", "");
        assert!(matches!(result, Err(ExchangeError::MissingCredentials)));
    }

    #[test]
    fn test_secret_accessible_for_signing() {
        let creds = Credentials::new("key", "secret").unwrap();
        assert_eq!(creds.api_key, "key");
        assert_eq!(creds.expose_secret(), "secret");
    }
}
