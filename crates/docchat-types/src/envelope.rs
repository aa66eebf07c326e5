//! Response envelope formats used by the backend.
//!
//! Most endpoints wrap their payload in:
//! ```json
//! { "status": "success", "message": "...", "data": { ... } }
//! ```
//! The paginated message listing instead returns `{ "data": [...], "meta": {...} }`,
//! and error responses carry a FastAPI `detail` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::{ChatSession, Message};

/// Status string the backend uses for successful envelopes.
pub const STATUS_SUCCESS: &str = "success";

/// Envelope wrapping most API payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Session listing payload.
///
/// Depending on the backend revision, `data` is the list itself or an object
/// with a nested `data` list; a null payload means no sessions.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SessionList {
    Flat(Vec<ChatSession>),
    Nested { data: Vec<ChatSession> },
    Empty(Option<()>),
}

impl SessionList {
    pub fn into_sessions(self) -> Vec<ChatSession> {
        match self {
            SessionList::Flat(sessions) | SessionList::Nested { data: sessions } => sessions,
            SessionList::Empty(_) => Vec::new(),
        }
    }
}

/// A payload that is either the value itself or `{ "data": value }`.
///
/// Record endpoints disagree on how many times they wrap: `GET /sessions/{id}`
/// puts the record straight into the envelope's `data`, while
/// `POST /sessions/` wraps it again.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Wrapped<T> {
    Flat(T),
    Nested { data: T },
}

impl<T> Wrapped<T> {
    pub fn into_inner(self) -> T {
        match self {
            Wrapped::Flat(value) | Wrapped::Nested { data: value } => value,
        }
    }
}

/// Single-session payload: a bare record, or an envelope whose `data` holds
/// the record once or twice wrapped.
pub type SessionRecord = Wrapped<Wrapped<ChatSession>>;

impl SessionRecord {
    pub fn into_session(self) -> ChatSession {
        self.into_inner().into_inner()
    }
}

/// Pagination metadata for message listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub has_next_page: bool,
}

/// One page of messages. Page 1 holds the newest messages; each page is in
/// chronological order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub data: Vec<Message>,
    #[serde(default)]
    pub meta: PageMeta,
}

/// Login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Refresh payload: an object carrying `access_token`, or the bare token.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RefreshData {
    Tokens {
        access_token: String,
        #[serde(default)]
        refresh_token: Option<String>,
    },
    Bare(String),
}

impl RefreshData {
    pub fn access_token(&self) -> &str {
        match self {
            RefreshData::Tokens { access_token, .. } => access_token,
            RefreshData::Bare(token) => token,
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            RefreshData::Tokens { refresh_token, .. } => refresh_token.as_deref(),
            RefreshData::Bare(_) => None,
        }
    }
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Human-readable explanation, preferring `detail` over `message`.
    ///
    /// Validation errors carry `detail` as a list of objects with a `msg`
    /// field; those are joined.
    pub fn explanation(&self) -> Option<String> {
        match &self.detail {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                if !msgs.is_empty() {
                    return Some(msgs.join("; "));
                }
            }
            _ => {}
        }
        self.message.clone().filter(|m| !m.is_empty())
    }
}
