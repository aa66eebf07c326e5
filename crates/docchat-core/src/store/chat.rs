//! Sessions and the messages of the session being viewed.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use docchat_types::chat::{ChatSession, Message, MessageId};
use docchat_types::error::ClientError;
use docchat_types::event::{Notice, StoreEvent};

use super::{read, write};
use crate::backend::ChatBackend;
use crate::event::EventBus;

/// Snapshot of chat state.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub sessions: Vec<ChatSession>,
    pub current_session: Option<ChatSession>,
    /// Messages of the current session, oldest first.
    pub messages: Vec<Message>,
    pub is_loading: bool,
    /// A chat turn is in flight.
    pub is_streaming: bool,
}

/// Shared handle to chat state.
#[derive(Clone)]
pub struct ChatStore {
    state: Arc<RwLock<ChatState>>,
    bus: EventBus,
}

impl ChatStore {
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: Arc::new(RwLock::new(ChatState::default())),
            bus,
        }
    }

    pub fn snapshot(&self) -> ChatState {
        read(&self.state).clone()
    }

    pub fn sessions(&self) -> Vec<ChatSession> {
        read(&self.state).sessions.clone()
    }

    pub fn current_session(&self) -> Option<ChatSession> {
        read(&self.state).current_session.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        read(&self.state).messages.clone()
    }

    pub fn message(&self, id: &MessageId) -> Option<Message> {
        read(&self.state).messages.iter().find(|m| &m.id == id).cloned()
    }

    pub fn message_count(&self) -> usize {
        read(&self.state).messages.len()
    }

    pub fn is_loading(&self) -> bool {
        read(&self.state).is_loading
    }

    pub fn is_streaming(&self) -> bool {
        read(&self.state).is_streaming
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn set_sessions(&self, sessions: Vec<ChatSession>) {
        let count = sessions.len();
        write(&self.state).sessions = sessions;
        self.bus.publish(StoreEvent::SessionsChanged { count });
    }

    pub fn set_current_session(&self, session: Option<ChatSession>) {
        let session_id = session.as_ref().map(|s| s.id);
        write(&self.state).current_session = session;
        self.bus
            .publish(StoreEvent::CurrentSessionChanged { session_id });
    }

    /// Replace the message list.
    pub fn set_messages(&self, messages: Vec<Message>) {
        let count = messages.len();
        write(&self.state).messages = messages;
        self.bus.publish(StoreEvent::MessagesChanged { count });
    }

    /// Rewrite the message list in place.
    pub fn update_messages(&self, update: impl FnOnce(&mut Vec<Message>)) {
        let count = {
            let mut state = write(&self.state);
            update(&mut state.messages);
            state.messages.len()
        };
        self.bus.publish(StoreEvent::MessagesChanged { count });
    }

    /// Append one message at the end.
    pub fn add_message(&self, message: Message) {
        let count = {
            let mut state = write(&self.state);
            state.messages.push(message);
            state.messages.len()
        };
        self.bus.publish(StoreEvent::MessagesChanged { count });
    }

    /// Replace the content of the message with `id`. Returns `false` (and
    /// changes nothing) when no such message exists.
    pub fn update_message(&self, id: &MessageId, content: impl Into<String>) -> bool {
        let updated = {
            let mut state = write(&self.state);
            match state.messages.iter_mut().find(|m| &m.id == id) {
                Some(message) => {
                    message.content = content.into();
                    true
                }
                None => false,
            }
        };
        if updated {
            self.bus.publish(StoreEvent::MessageUpdated { id: id.clone() });
        }
        updated
    }

    /// Put an older page in front of the current messages, skipping any
    /// message already shown. Returns how many were added.
    ///
    /// A message counts as shown when its id is present, or when it matches
    /// the role and content of a locally created message: turns sent in this
    /// session reappear in older pages under their server ids once enough
    /// newer turns push them back.
    pub fn prepend_messages(&self, older: Vec<Message>) -> usize {
        let (added, count) = {
            let mut state = write(&self.state);
            let mut seen: HashSet<MessageId> =
                state.messages.iter().map(|m| m.id.clone()).collect();
            let mut local: Vec<&Message> =
                state.messages.iter().filter(|m| m.id.is_local()).collect();

            let mut fresh = Vec::with_capacity(older.len());
            for message in older {
                if seen.contains(&message.id) {
                    continue;
                }
                if let Some(pos) = local
                    .iter()
                    .position(|m| m.role == message.role && m.content == message.content)
                {
                    local.remove(pos);
                    continue;
                }
                seen.insert(message.id.clone());
                fresh.push(message);
            }

            let added = fresh.len();
            if added > 0 {
                fresh.append(&mut state.messages);
                state.messages = fresh;
            }
            (added, state.messages.len())
        };
        if added > 0 {
            self.bus.publish(StoreEvent::MessagesChanged { count });
        }
        added
    }

    pub fn set_loading(&self, is_loading: bool) {
        write(&self.state).is_loading = is_loading;
    }

    pub fn set_streaming(&self, in_flight: bool) {
        write(&self.state).is_streaming = in_flight;
        self.bus.publish(StoreEvent::StreamingChanged { in_flight });
    }

    /// Drop everything, as on logout.
    pub fn reset(&self) {
        *write(&self.state) = ChatState::default();
        self.bus.publish(StoreEvent::SessionsChanged { count: 0 });
        self.bus
            .publish(StoreEvent::CurrentSessionChanged { session_id: None });
        self.bus.publish(StoreEvent::MessagesChanged { count: 0 });
    }

    /// Refresh the session list. On failure the list is emptied and a
    /// notice goes out.
    pub async fn load_sessions<B: ChatBackend>(&self, backend: &B) -> Result<(), ClientError> {
        self.set_loading(true);
        let result = backend.list_sessions().await;
        self.set_loading(false);

        match result {
            Ok(sessions) => {
                tracing::debug!(count = sessions.len(), "loaded sessions");
                self.set_sessions(sessions);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load sessions");
                self.set_sessions(Vec::new());
                self.bus.notify(Notice::error("Failed to load sessions"));
                Err(e)
            }
        }
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}

impl std::fmt::Debug for ChatStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = read(&self.state);
        f.debug_struct("ChatStore")
            .field("sessions", &state.sessions.len())
            .field("messages", &state.messages.len())
            .field("is_streaming", &state.is_streaming)
            .finish()
    }
}
