//! The `ChatBackend` port: everything the stores need from the remote API.
//!
//! Implemented by `docchat-infra`'s `ApiClient`. Follows the RPITIT pattern
//! used for the other ports so implementations stay zero-cost and generic.

use std::pin::Pin;

use docchat_types::chat::ChatSession;
use docchat_types::envelope::MessagePage;
use docchat_types::error::ClientError;
use docchat_types::user::User;
use futures_util::Stream;
use uuid::Uuid;

/// Stream of decoded reply text. Each item is one chunk as it arrived.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

/// Read and chat operations against the document-chat backend.
pub trait ChatBackend: Send + Sync {
    /// The signed-in user's profile.
    fn me(&self) -> impl std::future::Future<Output = Result<User, ClientError>> + Send;

    /// All sessions belonging to the signed-in user.
    fn list_sessions(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSession>, ClientError>> + Send;

    /// A single session's metadata.
    fn get_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<ChatSession, ClientError>> + Send;

    /// One page of a session's messages. Page 1 holds the newest messages.
    fn list_messages(
        &self,
        session_id: &Uuid,
        page: u32,
        page_size: u32,
    ) -> impl std::future::Future<Output = Result<MessagePage, ClientError>> + Send;

    /// Send a query and stream back the reply text.
    ///
    /// The returned future resolves once response headers arrive; the reply
    /// body follows through the stream.
    fn chat_stream(
        &self,
        session_id: &Uuid,
        query: &str,
    ) -> impl std::future::Future<Output = Result<ReplyStream, ClientError>> + Send;
}
