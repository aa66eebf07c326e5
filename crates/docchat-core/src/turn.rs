//! One question/answer exchange, streamed.
//!
//! `TurnController` enforces a single in-flight request per client. A turn
//! adds the user's message and an empty assistant placeholder to the chat
//! store, then fills the placeholder as reply chunks arrive. Stopping or
//! failing replaces the placeholder with a fixed text. Whatever happens, the
//! in-flight flag is released and the session list is reloaded afterwards
//! (the backend may have renamed or re-ordered sessions).

use std::sync::{Arc, Mutex, PoisonError};

use docchat_types::chat::{Message, MessageId};
use docchat_types::error::ClientError;
use docchat_types::event::Notice;
use futures_util::StreamExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backend::ChatBackend;
use crate::store::ChatStore;

/// Placeholder text after the user stops a reply.
pub const STOPPED_TEXT: &str = "*Response stopped by user*";

/// Placeholder text after a reply fails.
pub const FAILED_TEXT: &str = "I'm sorry, I encountered an error while processing your request. \
Please try again. If the problem persists, check your internet connection or contact support.";

/// Notice shown alongside [`FAILED_TEXT`].
pub const FAILED_NOTICE: &str = "Unable to get response. Please try again.";

/// Why a turn was not started.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("a reply is already in progress")]
    Busy,

    #[error("message is empty")]
    EmptyMessage,
}

/// How a started turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    Completed { reply: String },
    Stopped,
    Failed(ClientError),
}

/// Runs chat turns, at most one at a time.
#[derive(Clone)]
pub struct TurnController {
    store: ChatStore,
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl TurnController {
    pub fn new(store: ChatStore) -> Self {
        Self {
            store,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Cancel the in-flight turn. Returns `false` when there is none.
    pub fn stop(&self) -> bool {
        match self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(token) => {
                tracing::info!("stopping in-flight reply");
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn claim(&self) -> Result<InFlight<'_>, TurnError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            return Err(TurnError::Busy);
        }
        let token = CancellationToken::new();
        *active = Some(token.clone());
        drop(active);
        self.store.set_streaming(true);
        Ok(InFlight {
            controller: self,
            token,
        })
    }

    /// Send `text` in `session_id` and stream the reply into the store.
    ///
    /// `on_chunk` sees each chunk as it arrives. The turn itself never
    /// returns `Err` once started: stops and failures are reported through
    /// [`TurnOutcome`] after the placeholder has been rewritten.
    pub async fn send<B: ChatBackend>(
        &self,
        backend: &B,
        session_id: Uuid,
        text: &str,
        mut on_chunk: impl FnMut(&str),
    ) -> Result<TurnOutcome, TurnError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(TurnError::EmptyMessage);
        }
        let in_flight = self.claim()?;
        let cancel = in_flight.token.clone();

        self.store.add_message(Message::local_user(session_id, query));
        let placeholder = Message::assistant_placeholder(session_id);
        let placeholder_id = placeholder.id.clone();
        self.store.add_message(placeholder);

        tracing::info!(%session_id, chars = query.chars().count(), "sending chat turn");

        let result = self
            .stream_reply(backend, session_id, query, &cancel, &placeholder_id, &mut on_chunk)
            .await;

        let outcome = match result {
            Ok(Some(reply)) => {
                tracing::info!(%session_id, chars = reply.chars().count(), "reply complete");
                TurnOutcome::Completed { reply }
            }
            Ok(None) => {
                tracing::info!(%session_id, "reply stopped by user");
                self.store.update_message(&placeholder_id, STOPPED_TEXT);
                TurnOutcome::Stopped
            }
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "reply failed");
                self.store.update_message(&placeholder_id, FAILED_TEXT);
                self.store.bus().notify(Notice::error(FAILED_NOTICE));
                TurnOutcome::Failed(e)
            }
        };

        drop(in_flight);
        let _ = self.store.load_sessions(backend).await;
        Ok(outcome)
    }
}

impl TurnController {
    /// Open the stream and copy chunks into the placeholder. `Ok(None)`
    /// means the turn was cancelled.
    async fn stream_reply<B: ChatBackend>(
        &self,
        backend: &B,
        session_id: Uuid,
        query: &str,
        cancel: &CancellationToken,
        placeholder_id: &MessageId,
        on_chunk: &mut impl FnMut(&str),
    ) -> Result<Option<String>, ClientError> {
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            opened = backend.chat_stream(&session_id, query) => opened?,
        };

        let mut reply = String::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(None),
                next = stream.next() => match next {
                    Some(chunk) => {
                        let chunk = chunk?;
                        reply.push_str(&chunk);
                        self.store.update_message(placeholder_id, reply.as_str());
                        on_chunk(&chunk);
                    }
                    None => return Ok(Some(reply)),
                },
            }
        }
    }
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("in_flight", &self.is_in_flight())
            .finish()
    }
}

/// Holds the single in-flight slot; releases it on drop, including when the
/// `send` future itself is dropped mid-stream.
struct InFlight<'a> {
    controller: &'a TurnController,
    token: CancellationToken,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self
            .controller
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.controller.store.set_streaming(false);
    }
}
