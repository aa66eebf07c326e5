//! Application state wiring the stores and the API client together.
//!
//! AppState holds the concrete instances every command works with: the
//! resolved data directory and config, one event bus shared by both stores,
//! and an `ApiClient` whose HTTP layer logs the auth store out when a token
//! refresh fails.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use docchat_core::event::EventBus;
use docchat_core::store::{AuthStore, ChatStore};
use docchat_infra::api::ApiClient;
use docchat_infra::config::{load_client_config, validate_base_url};
use docchat_infra::filesystem::resolve_data_dir;
use docchat_infra::token::open_token_store;
use docchat_types::config::{ClientConfig, TokenStoreKind};
use docchat_types::error::ClientError;
use docchat_types::user::User;

/// Command-line overrides applied on top of `config.toml`.
#[derive(Debug, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub no_persist: bool,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: ClientConfig,
    pub bus: EventBus,
    pub auth: AuthStore,
    pub chat: ChatStore,
    pub api: Arc<ApiClient>,
}

impl AppState {
    /// Resolve the data directory, load config, open the token store and
    /// build the API client.
    pub async fn init(overrides: Overrides) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let mut config = load_client_config(&data_dir).await;
        apply_overrides(&mut config, overrides)?;
        tracing::debug!(base_url = %config.base_url, token_store = %config.token_store, "configuration loaded");

        let bus = EventBus::default();
        let tokens = open_token_store(config.token_store, &data_dir);
        let auth = AuthStore::new(tokens, bus.clone());
        let chat = ChatStore::new(bus.clone());
        let api = ApiClient::new(&config, auth.clone()).context("Failed to build HTTP client")?;

        Ok(Self {
            data_dir,
            config,
            bus,
            auth,
            chat,
            api: Arc::new(api),
        })
    }

    /// The signed-in user, fetched from the server.
    ///
    /// Fails with [`ClientError::NotLoggedIn`] when no token is stored and
    /// with [`ClientError::SessionExpired`] when the server no longer
    /// accepts it. A transport failure leaves the tokens in place.
    pub async fn require_user(&self) -> anyhow::Result<User> {
        if !self.auth.is_authenticated() {
            return Err(ClientError::NotLoggedIn.into());
        }
        match self.auth.fetch_user(self.api.as_ref()).await? {
            Some(user) => Ok(user),
            None => Err(ClientError::NotLoggedIn.into()),
        }
    }

    /// Restore the stored session before an interactive chat.
    ///
    /// Unlike [`require_user`](Self::require_user), a failed profile fetch
    /// here logs the client out.
    pub async fn restore_session(&self) -> anyhow::Result<User> {
        match self.auth.initialize(self.api.as_ref()).await? {
            Some(user) => Ok(user),
            None => Err(ClientError::NotLoggedIn.into()),
        }
    }
}

fn apply_overrides(config: &mut ClientConfig, overrides: Overrides) -> anyhow::Result<()> {
    if let Some(base_url) = overrides.base_url {
        config.base_url = base_url;
    }
    if overrides.no_persist {
        config.token_store = TokenStoreKind::Memory;
    }
    validate_base_url(&config.base_url)?;
    Ok(())
}
