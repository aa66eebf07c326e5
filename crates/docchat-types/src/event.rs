//! Change notifications published by the client stores.
//!
//! Views subscribe to these instead of polling store state. Events carry just
//! enough to decide whether to re-read; the store snapshot is authoritative.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::MessageId;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient message for the user, the terminal equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Something observable changed in a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// Signed-in user or authenticated flag changed.
    AuthChanged { is_authenticated: bool },

    /// The session list was replaced.
    SessionsChanged { count: usize },

    /// The session being viewed changed.
    CurrentSessionChanged { session_id: Option<Uuid> },

    /// The message list was replaced or grew.
    MessagesChanged { count: usize },

    /// A single message's content changed in place (streaming).
    MessageUpdated { id: MessageId },

    /// A chat turn started or finished.
    StreamingChanged { in_flight: bool },

    Notice(Notice),
}
