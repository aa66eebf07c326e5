//! The `TokenStore` port and an in-memory implementation.
//!
//! Token storage is synchronous: the file and keychain backends are both
//! blocking calls that finish in microseconds, and the HTTP client needs to
//! share one store as `Arc<dyn TokenStore>` across clones.

use std::sync::{Mutex, PoisonError};

use docchat_types::auth::TokenPair;
use docchat_types::error::TokenStoreError;
use secrecy::{ExposeSecret, SecretString};

/// Persistent home of the access and refresh tokens.
pub trait TokenStore: Send + Sync {
    /// Both tokens, or `None` when logged out.
    fn load(&self) -> Result<Option<TokenPair>, TokenStoreError>;

    /// Replace both tokens.
    fn save(&self, tokens: &TokenPair) -> Result<(), TokenStoreError>;

    /// Remove both tokens. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), TokenStoreError>;

    fn access_token(&self) -> Result<Option<SecretString>, TokenStoreError> {
        Ok(self.load()?.map(|pair| pair.access_token))
    }

    fn refresh_token(&self) -> Result<Option<SecretString>, TokenStoreError> {
        Ok(self.load()?.and_then(|pair| pair.refresh_token))
    }

    /// Swap in a new access token, keeping the current refresh token unless a
    /// rotated one is supplied.
    fn rotate(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), TokenStoreError> {
        let current_refresh = self.refresh_token()?;
        let refresh = match refresh_token {
            Some(rotated) => Some(rotated.to_string()),
            None => current_refresh.map(|t| t.expose_secret().to_string()),
        };
        self.save(&TokenPair::new(access_token, refresh))
    }
}

/// Tokens held in process memory only.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, TokenStoreError> {
        Ok(self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), TokenStoreError> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

impl std::fmt::Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTokenStore").finish_non_exhaustive()
    }
}
