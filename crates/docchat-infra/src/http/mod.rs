//! Authenticated HTTP transport.
//!
//! [`HttpClient`] wraps a `reqwest::Client` and owns the token dance:
//!
//! 1. every request carries `Authorization: Bearer <access>` when a token is stored;
//! 2. on a 401, the refresh token is exchanged at `POST /auth/refresh`
//!    (form body) and the request is re-sent exactly once with the new token;
//! 3. a 401 on the re-sent request is final (`Unauthorized`);
//! 4. if the refresh itself fails, both tokens are cleared, the auth store
//!    logs out, and the caller gets `SessionExpired`.
//!
//! Tokens are [`SecretString`]s and never logged. `HttpClient` does not
//! implement `Debug`.

pub mod stream;

use std::sync::Arc;
use std::time::Duration;

use docchat_core::store::AuthStore;
use docchat_core::token::TokenStore;
use docchat_types::auth::bearer;
use docchat_types::config::ClientConfig;
use docchat_types::envelope::{ApiEnvelope, ErrorBody, RefreshData};
use docchat_types::error::ClientError;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    auth: AuthStore,
    /// Serializes refreshes so concurrent 401s mint one token, not several.
    refresh_lock: Mutex<()>,
}

impl HttpClient {
    pub fn new(config: &ClientConfig, auth: AuthStore) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("docchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.normalized_base_url().to_string(),
            auth,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an API path such as `/sessions/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        self.auth.tokens()
    }

    /// Send without credentials and without refresh handling. The response
    /// is returned whatever its status.
    pub async fn send_public(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        request.send().await.map_err(transport_error)
    }

    /// Send once with the stored bearer token, no refresh. The response is
    /// returned whatever its status.
    pub async fn send_once(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let token = self.tokens().access_token()?;
        self.dispatch(request, token.as_ref()).await
    }

    /// Send an authenticated request, refreshing the access token once on 401.
    ///
    /// `build` is called once per attempt, so request bodies are rebuilt
    /// for the retry. Non-2xx responses become [`ClientError::Api`].
    pub async fn send<F>(&self, build: F) -> Result<Response, ClientError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let token = self.tokens().access_token()?;
        let response = self.dispatch(build(&self.client), token.as_ref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        tracing::debug!(url = %response.url(), "access token rejected, refreshing");
        let fresh = self.refresh(token.as_ref()).await?;

        let retry = self.dispatch(build(&self.client), Some(&fresh)).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(url = %retry.url(), "request rejected again after token refresh");
            return Err(ClientError::Unauthorized);
        }
        check_status(retry).await
    }

    async fn dispatch(
        &self,
        request: RequestBuilder,
        token: Option<&SecretString>,
    ) -> Result<Response, ClientError> {
        let request = match token {
            Some(token) => request.header(AUTHORIZATION, bearer(token)),
            None => request,
        };
        request.send().await.map_err(transport_error)
    }

    /// Obtain a usable access token after `rejected` was refused.
    ///
    /// If another request refreshed while this one waited for the lock, the
    /// newer stored token is returned without a second refresh.
    async fn refresh(&self, rejected: Option<&SecretString>) -> Result<SecretString, ClientError> {
        let _guard = self.refresh_lock.lock().await;

        if let (Some(rejected), Some(current)) = (rejected, self.tokens().access_token()?) {
            if rejected.expose_secret() != current.expose_secret() {
                tracing::debug!("access token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        match self.exchange_refresh_token().await {
            Ok(token) => {
                tracing::info!("access token refreshed");
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed, logging out");
                self.auth.logout();
                Err(ClientError::SessionExpired)
            }
        }
    }

    async fn exchange_refresh_token(&self) -> Result<SecretString, ClientError> {
        let refresh_token = self
            .tokens()
            .refresh_token()?
            .ok_or(ClientError::NotLoggedIn)?;

        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .form(&[("refresh_token", refresh_token.expose_secret())])
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;

        let envelope: ApiEnvelope<RefreshData> = response
            .json()
            .await
            .map_err(|e| ClientError::Deserialization(format!("refresh response: {e}")))?;
        let data = envelope.data;

        self.tokens()
            .rotate(data.access_token(), data.refresh_token())?;
        Ok(SecretString::from(data.access_token().to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}

/// Pass 2xx responses through; turn anything else into [`ClientError::Api`].
pub async fn check_status(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(api_error(response).await)
    }
}

/// Build an [`ClientError::Api`] from a failed response, preferring the
/// backend's `detail` or `message` over the raw body.
pub async fn api_error(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.explanation())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });
    ClientError::Api {
        status: status.as_u16(),
        detail,
    }
}
