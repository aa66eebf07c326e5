//! Who is signed in.

use std::sync::{Arc, RwLock};

use docchat_types::error::ClientError;
use docchat_types::event::StoreEvent;
use docchat_types::user::User;

use super::{read, write};
use crate::backend::ChatBackend;
use crate::event::EventBus;
use crate::token::TokenStore;

/// Snapshot of authentication state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

/// Shared handle to the signed-in user and the token store behind it.
#[derive(Clone)]
pub struct AuthStore {
    state: Arc<RwLock<AuthState>>,
    tokens: Arc<dyn TokenStore>,
    bus: EventBus,
}

impl AuthStore {
    /// A store over `tokens`. Starts authenticated iff an access token is
    /// already stored, with the user unknown until [`fetch_user`](Self::fetch_user).
    pub fn new(tokens: Arc<dyn TokenStore>, bus: EventBus) -> Self {
        let has_token = match tokens.access_token() {
            Ok(token) => token.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored access token");
                false
            }
        };
        Self {
            state: Arc::new(RwLock::new(AuthState {
                user: None,
                is_authenticated: has_token,
            })),
            tokens,
            bus,
        }
    }

    pub fn snapshot(&self) -> AuthState {
        read(&self.state).clone()
    }

    pub fn user(&self) -> Option<User> {
        read(&self.state).user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        read(&self.state).is_authenticated
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Record the signed-in user. `None` marks the client unauthenticated.
    pub fn set_user(&self, user: Option<User>) {
        let is_authenticated = user.is_some();
        {
            let mut state = write(&self.state);
            state.user = user;
            state.is_authenticated = is_authenticated;
        }
        self.bus.publish(StoreEvent::AuthChanged { is_authenticated });
    }

    /// Forget the user and both tokens.
    pub fn logout(&self) {
        if let Err(e) = self.tokens.clear() {
            tracing::warn!(error = %e, "failed to clear stored tokens");
        }
        self.set_user(None);
        tracing::debug!("logged out");
    }

    /// Fetch the profile for the stored token.
    ///
    /// Returns `Ok(None)` without a request when no token is stored. On
    /// failure the user is cleared but the tokens are left alone.
    pub async fn fetch_user<B: ChatBackend>(
        &self,
        backend: &B,
    ) -> Result<Option<User>, ClientError> {
        if self.tokens.access_token()?.is_none() {
            return Ok(None);
        }
        match backend.me().await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "fetched current user");
                self.set_user(Some(user.clone()));
                Ok(Some(user))
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch current user");
                self.set_user(None);
                Err(e)
            }
        }
    }

    /// Restore a session on startup.
    ///
    /// With a stored token and no known user, fetch the profile. If that
    /// fails the stored token is unusable: the client logs out and the
    /// error is returned for the caller to report.
    pub async fn initialize<B: ChatBackend>(&self, backend: &B) -> Result<Option<User>, ClientError> {
        if self.tokens.access_token()?.is_none() {
            return Ok(None);
        }
        if let Some(user) = self.user() {
            return Ok(Some(user));
        }
        match self.fetch_user(backend).await {
            Ok(user) => Ok(user),
            Err(e) => {
                self.logout();
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("state", &*read(&self.state))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBackend, user};
    use crate::token::MemoryTokenStore;
    use docchat_types::auth::TokenPair;

    fn logged_in_tokens() -> Arc<dyn TokenStore> {
        Arc::new(MemoryTokenStore::with_tokens(TokenPair::new(
            "access",
            Some("refresh".to_string()),
        )))
    }

    #[test]
    fn starts_authenticated_only_with_a_stored_token() {
        let anon = AuthStore::new(Arc::new(MemoryTokenStore::new()), EventBus::default());
        assert!(!anon.is_authenticated());

        let store = AuthStore::new(logged_in_tokens(), EventBus::default());
        assert!(store.is_authenticated());
        assert!(store.user().is_none());
    }

    #[tokio::test]
    async fn fetch_user_sets_profile_and_publishes() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let store = AuthStore::new(logged_in_tokens(), bus);
        let backend = FakeBackend::new().with_user(user());

        let fetched = store.fetch_user(&backend).await.unwrap();

        assert_eq!(fetched.unwrap().email, "ada@example.com");
        assert!(store.is_authenticated());
        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::AuthChanged {
                is_authenticated: true
            }
        );
    }

    #[tokio::test]
    async fn fetch_user_without_token_skips_request() {
        let store = AuthStore::new(Arc::new(MemoryTokenStore::new()), EventBus::default());
        let backend = FakeBackend::new().with_user(user());

        assert!(store.fetch_user(&backend).await.unwrap().is_none());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn fetch_user_failure_clears_user_but_keeps_tokens() {
        let tokens = logged_in_tokens();
        let store = AuthStore::new(tokens.clone(), EventBus::default());
        let backend = FakeBackend::new();

        assert!(store.fetch_user(&backend).await.is_err());
        assert!(!store.is_authenticated());
        assert!(tokens.access_token().unwrap().is_some());
    }

    #[tokio::test]
    async fn initialize_logs_out_when_profile_fetch_fails() {
        let tokens = logged_in_tokens();
        let store = AuthStore::new(tokens.clone(), EventBus::default());

        let err = store.initialize(&FakeBackend::new()).await.unwrap_err();

        assert!(matches!(err, ClientError::Unauthorized));
        assert!(tokens.load().unwrap().is_none());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn initialize_restores_user() {
        let store = AuthStore::new(logged_in_tokens(), EventBus::default());
        let backend = FakeBackend::new().with_user(user());

        let restored = store.initialize(&backend).await.unwrap().unwrap();
        assert_eq!(restored.display_name(), "Ada");
    }

    #[tokio::test]
    async fn initialize_without_token_is_anonymous() {
        let store = AuthStore::new(Arc::new(MemoryTokenStore::new()), EventBus::default());
        let backend = FakeBackend::new().with_user(user());

        assert!(store.initialize(&backend).await.unwrap().is_none());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn initialize_keeps_a_known_user() {
        let store = AuthStore::new(logged_in_tokens(), EventBus::default());
        store.set_user(Some(user()));

        // No profile on the backend: a request would fail.
        let kept = store.initialize(&FakeBackend::new()).await.unwrap();

        assert_eq!(kept, Some(user()));
        assert!(store.is_authenticated());
    }

    #[test]
    fn logout_clears_tokens_and_user() {
        let tokens = logged_in_tokens();
        let store = AuthStore::new(tokens.clone(), EventBus::default());
        store.set_user(Some(user()));

        store.logout();

        assert_eq!(store.snapshot(), AuthState::default());
        assert!(tokens.load().unwrap().is_none());
    }
}
