//! Token types persisted by the client.
//!
//! The client keeps exactly two strings between runs: the access token sent
//! as a bearer credential and the refresh token used to mint a new one.

use secrecy::{ExposeSecret, SecretString};

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Access + refresh token pair.
///
/// Both values are wrapped in [`SecretString`] so they never show up in
/// `Debug` output or logs.
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: refresh_token.map(SecretString::from),
        }
    }

    /// `Authorization` header value for this pair's access token.
    pub fn bearer(&self) -> String {
        bearer(&self.access_token)
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Build an `Authorization` header value from a token.
pub fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        let pair = TokenPair::new("abc", None);
        assert_eq!(pair.bearer(), "Bearer abc");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let pair = TokenPair::new("very-secret", Some("also-secret".to_string()));
        let debug = format!("{pair:?}");
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("also-secret"));
        assert!(debug.contains("has_refresh_token: true"));
    }
}
