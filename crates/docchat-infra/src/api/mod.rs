//! Typed bindings for the document-chat REST API.
//!
//! [`ApiClient`] implements the [`ChatBackend`] port on top of
//! [`HttpClient`], plus the account, session-management and document calls
//! that only the command line needs.

mod documents;

use docchat_core::backend::{ChatBackend, ReplyStream};
use docchat_core::store::AuthStore;
use docchat_types::auth::TokenPair;
use docchat_types::chat::ChatSession;
use docchat_types::config::ClientConfig;
use docchat_types::envelope::{
    ApiEnvelope, ErrorBody, LoginData, MessagePage, SessionList, SessionRecord,
};
use docchat_types::error::ClientError;
use docchat_types::user::{NewAccount, RegisteredUser, User};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::http::stream::text_stream;
use crate::http::{HttpClient, api_error, check_status};

/// Detail the backend sends when the login email is unknown.
const USER_NOT_FOUND_DETAIL: &str = "User not found";

#[derive(Serialize)]
struct ChatRequest<'a> {
    session_id: Uuid,
    query: &'a str,
}

pub struct ApiClient {
    http: HttpClient,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, auth: AuthStore) -> Result<Self, ClientError> {
        Ok(Self {
            http: HttpClient::new(config, auth)?,
        })
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn auth(&self) -> &AuthStore {
        self.http.auth()
    }

    /// Create an account. Registration does not sign in.
    pub async fn register(&self, account: &NewAccount<'_>) -> Result<RegisteredUser, ClientError> {
        let request = self
            .http
            .client()
            .post(self.http.url("/auth/register"))
            .json(account);
        let response = check_status(self.http.send_public(request).await?).await?;
        let status = response.status();
        let envelope: ApiEnvelope<serde_json::Value> = read_json(response).await?;
        let data = success_data(status, envelope, "Registration failed")?;
        let registered: RegisteredUser = serde_json::from_value(data)
            .map_err(|e| ClientError::Deserialization(format!("register response: {e}")))?;
        tracing::info!("account registered");
        Ok(registered)
    }

    /// Exchange credentials for tokens, store them, and load the profile.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let request = self.http.client().post(self.http.url("/auth/login")).form(&[
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ]);
        let response = self.http.send_public(request).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(match body.explanation().as_deref() {
                Some(USER_NOT_FOUND_DETAIL) => ClientError::UserNotFound,
                _ => ClientError::InvalidCredentials,
            });
        }
        if !status.is_success() {
            return Err(api_error(response).await);
        }

        let envelope: ApiEnvelope<serde_json::Value> = read_json(response).await?;
        let data: LoginData = serde_json::from_value(success_data(status, envelope, "Login failed")?)
            .map_err(|e| ClientError::Deserialization(format!("login response: {e}")))?;

        self.http
            .tokens()
            .save(&TokenPair::new(data.access_token, data.refresh_token))?;

        let user = self
            .auth()
            .fetch_user(self)
            .await?
            .ok_or(ClientError::NotLoggedIn)?;
        tracing::info!(user_id = %user.id, "logged in");
        Ok(user)
    }

    /// Tell the backend (best effort) and forget the tokens either way.
    pub async fn logout(&self) {
        let request = self.http.client().post(self.http.url("/auth/logout"));
        match self.http.send_once(request).await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("server session closed");
            }
            Ok(response) => {
                tracing::debug!(status = %response.status(), "logout rejected by server");
            }
            Err(e) => tracing::debug!(error = %e, "logout request failed"),
        }
        self.auth().logout();
        tracing::info!("logged out");
    }

    pub async fn create_session(&self, name: &str) -> Result<ChatSession, ClientError> {
        let url = self.http.url("/sessions/");
        let response = self
            .http
            .send(|c| c.post(&url).query(&[("session_name", name)]))
            .await?;
        let session = read_json::<SessionRecord>(response).await?.into_session();
        tracing::info!(session_id = %session.id, "created session");
        Ok(session)
    }

    pub async fn rename_session(&self, session_id: &Uuid, name: &str) -> Result<ChatSession, ClientError> {
        let url = self.http.url(&format!("/sessions/{session_id}"));
        let response = self
            .http
            .send(|c| c.patch(&url).query(&[("name", name)]))
            .await?;
        let session = read_json::<SessionRecord>(response).await?.into_session();
        tracing::info!(%session_id, "renamed session");
        Ok(session)
    }

    pub async fn delete_session(&self, session_id: &Uuid) -> Result<(), ClientError> {
        let url = self.http.url(&format!("/sessions/{session_id}"));
        self.http.send(|c| c.delete(&url)).await?;
        tracing::info!(%session_id, "deleted session");
        Ok(())
    }
}

impl ChatBackend for ApiClient {
    async fn me(&self) -> Result<User, ClientError> {
        let url = self.http.url("/auth/me");
        let response = self.http.send(|c| c.get(&url)).await?;
        Ok(read_json::<ApiEnvelope<User>>(response).await?.data)
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, ClientError> {
        let url = self.http.url("/sessions/");
        let response = self.http.send(|c| c.get(&url)).await?;
        Ok(read_json::<ApiEnvelope<SessionList>>(response)
            .await?
            .data
            .into_sessions())
    }

    async fn get_session(&self, session_id: &Uuid) -> Result<ChatSession, ClientError> {
        let url = self.http.url(&format!("/sessions/{session_id}"));
        let response = self.http.send(|c| c.get(&url)).await?;
        Ok(read_json::<SessionRecord>(response).await?.into_session())
    }

    async fn list_messages(
        &self,
        session_id: &Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<MessagePage, ClientError> {
        let url = self.http.url(&format!("/sessions/{session_id}/messages"));
        let response = self
            .http
            .send(|c| c.get(&url).query(&[("page", page), ("page_size", page_size)]))
            .await?;
        read_json(response).await
    }

    async fn chat_stream(&self, session_id: &Uuid, query: &str) -> Result<ReplyStream, ClientError> {
        let url = self.http.url("/chat/");
        let body = ChatRequest {
            session_id: *session_id,
            query,
        };
        let response = self.http.send(|c| c.post(&url).json(&body)).await?;
        tracing::debug!(%session_id, "reply stream opened");
        Ok(text_stream(response.bytes_stream()))
    }
}

/// The envelope's payload, or its message as an API error when the backend
/// answered 2xx with a non-success status.
fn success_data<T>(
    status: StatusCode,
    envelope: ApiEnvelope<T>,
    fallback: &str,
) -> Result<T, ClientError> {
    if envelope.is_success() {
        return Ok(envelope.data);
    }
    let detail = if envelope.message.is_empty() {
        fallback.to_string()
    } else {
        envelope.message
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        detail,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let url = response.url().path().to_string();
    response
        .json()
        .await
        .map_err(|e| ClientError::Deserialization(format!("{url}: {e}")))
}
