use thiserror::Error;

/// Errors from talking to the backend API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("session expired, please log in again")]
    SessionExpired,

    #[error("user not registered")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("cannot read {path}: {reason}")]
    LocalFile { path: String, reason: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("token storage error: {0}")]
    TokenStore(#[from] TokenStoreError),
}

impl ClientError {
    /// Whether the caller should treat this as a terminal auth failure.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ClientError::SessionExpired | ClientError::Unauthorized | ClientError::NotLoggedIn
        )
    }
}

/// Errors from token storage backends.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token storage unavailable: {0}")]
    Unavailable(String),

    #[error("token storage I/O error: {0}")]
    Io(String),

    #[error("corrupt token storage: {0}")]
    Corrupt(String),
}

/// Errors from validating client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ClientError::Api {
            status: 404,
            detail: "Chat session not found".to_string(),
        };
        assert_eq!(err.to_string(), "API error (404): Chat session not found");
    }

    #[test]
    fn test_token_store_error_converts() {
        let err: ClientError = TokenStoreError::Io("disk full".to_string()).into();
        assert_eq!(err.to_string(), "token storage error: token storage I/O error: disk full");
    }

    #[test]
    fn test_auth_failure_classification() {
        assert!(ClientError::SessionExpired.is_auth_failure());
        assert!(ClientError::NotLoggedIn.is_auth_failure());
        assert!(!ClientError::InvalidCredentials.is_auth_failure());
        assert!(!ClientError::Stream("reset".to_string()).is_auth_failure());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidBaseUrl {
            url: "localhost".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid base URL 'localhost': relative URL without a base"
        );
    }
}
