//! Scriptable in-memory `ChatBackend` shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use docchat_types::chat::{ChatSession, Message, MessageId, MessageRole};
use docchat_types::envelope::{MessagePage, PageMeta};
use docchat_types::error::ClientError;
use docchat_types::user::User;
use uuid::Uuid;

use crate::backend::{ChatBackend, ReplyStream};

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub user: Mutex<Option<User>>,
    pub sessions: Mutex<Vec<ChatSession>>,
    pub fail_sessions: AtomicBool,
    pub pages: Mutex<HashMap<u32, MessagePage>>,
    pub fail_messages: AtomicBool,
    pub reply_chunks: Mutex<Vec<String>>,
    pub reply_error: Mutex<Option<String>>,
    pub chunk_delay: Mutex<Option<Duration>>,
    pub session_list_calls: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        *self.user.lock().unwrap() = Some(user);
        self
    }

    pub fn with_sessions(self, sessions: Vec<ChatSession>) -> Self {
        *self.sessions.lock().unwrap() = sessions;
        self
    }

    pub fn with_page(self, page: u32, data: Vec<Message>, has_next_page: bool) -> Self {
        let meta = PageMeta {
            page,
            page_size: data.len() as u32,
            total: 0,
            has_next_page,
        };
        self.pages
            .lock()
            .unwrap()
            .insert(page, MessagePage { data, meta });
        self
    }

    pub fn with_reply(self, chunks: &[&str]) -> Self {
        *self.reply_chunks.lock().unwrap() = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_reply_error(self, message: &str) -> Self {
        *self.reply_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn with_chunk_delay(self, delay: Duration) -> Self {
        *self.chunk_delay.lock().unwrap() = Some(delay);
        self
    }
}

impl ChatBackend for FakeBackend {
    async fn me(&self) -> Result<User, ClientError> {
        self.user.lock().unwrap().clone().ok_or(ClientError::Unauthorized)
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, ClientError> {
        self.session_list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection refused".to_string()));
        }
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn get_session(&self, session_id: &Uuid) -> Result<ChatSession, ClientError> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| &s.id == session_id)
            .cloned()
            .ok_or(ClientError::Api {
                status: 404,
                detail: "Chat session not found".to_string(),
            })
    }

    async fn list_messages(
        &self,
        _session_id: &Uuid,
        page: u32,
        _page_size: u32,
    ) -> Result<MessagePage, ClientError> {
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection reset".to_string()));
        }
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&page)
            .cloned()
            .unwrap_or_default())
    }

    async fn chat_stream(&self, _session_id: &Uuid, query: &str) -> Result<ReplyStream, ClientError> {
        self.queries.lock().unwrap().push(query.to_string());
        let chunks = self.reply_chunks.lock().unwrap().clone();
        let error = self.reply_error.lock().unwrap().clone();
        let delay = *self.chunk_delay.lock().unwrap();

        Ok(Box::pin(async_stream::stream! {
            for chunk in chunks {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(chunk);
            }
            if let Some(message) = error {
                yield Err(ClientError::Stream(message));
            }
        }))
    }
}

pub(crate) fn session(name: &str) -> ChatSession {
    ChatSession {
        id: Uuid::now_v7(),
        name: name.to_string(),
        updated_at: None,
    }
}

pub(crate) fn user() -> User {
    serde_json::from_str(r#"{"id": 7, "email": "ada@example.com", "first_name": "Ada"}"#).unwrap()
}

/// A stored turn: user question then assistant answer, with server-style ids.
pub(crate) fn turn(question: &str, answer: &str, minute: u32) -> Vec<Message> {
    let turn_id = Uuid::new_v4();
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 10, minute, 0).unwrap();
    vec![
        Message {
            id: MessageId(turn_id.to_string()),
            session_id: None,
            role: MessageRole::User,
            content: question.to_string(),
            created_at: at,
        },
        Message {
            id: MessageId(format!("{turn_id}-a")),
            session_id: None,
            role: MessageRole::Assistant,
            content: answer.to_string(),
            created_at: at,
        },
    ]
}
