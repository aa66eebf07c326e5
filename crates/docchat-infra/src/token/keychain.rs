//! Tokens kept in the OS keychain.
//!
//! Uses the `keyring` crate (macOS Keychain, Linux Secret Service, Windows
//! Credential Manager). Each token is a separate entry under one service.

use docchat_core::token::TokenStore;
use docchat_types::auth::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenPair};
use docchat_types::error::TokenStoreError;
use secrecy::ExposeSecret;

/// Keychain service name.
pub const SERVICE_NAME: &str = "docchat";

pub struct KeychainTokenStore {
    service_name: String,
}

impl KeychainTokenStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a different service name (keeps test entries apart).
    pub fn with_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, TokenStoreError> {
        keyring::Entry::new(&self.service_name, key)
            .map_err(|e| TokenStoreError::Unavailable(format!("keychain entry error: {e}")))
    }

    fn get(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(TokenStoreError::Unavailable(format!("keychain get error: {e}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| TokenStoreError::Unavailable(format!("keychain set error: {e}")))
    }

    fn delete(&self, key: &str) -> Result<(), TokenStoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(TokenStoreError::Unavailable(format!(
                "keychain delete error: {e}"
            ))),
        }
    }
}

impl Default for KeychainTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeychainTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, TokenStoreError> {
        let Some(access) = self.get(ACCESS_TOKEN_KEY)? else {
            return Ok(None);
        };
        let refresh = self.get(REFRESH_TOKEN_KEY)?;
        Ok(Some(TokenPair::new(access, refresh)))
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), TokenStoreError> {
        self.set(ACCESS_TOKEN_KEY, tokens.access_token.expose_secret())?;
        match &tokens.refresh_token {
            Some(refresh) => self.set(REFRESH_TOKEN_KEY, refresh.expose_secret()),
            None => self.delete(REFRESH_TOKEN_KEY),
        }
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        self.delete(ACCESS_TOKEN_KEY)?;
        self.delete(REFRESH_TOKEN_KEY)
    }
}
