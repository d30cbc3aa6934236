use std::future::Future;
use std::pin::Pin;

mod client;
mod error;
mod types;

pub use client::{DEFAULT_BASE_URL, HttpBackend, HttpBackendBuilder};
pub use error::{ApiResult, TransportError};
pub use types::{ConversationId, ConversationSummary, HistoryRecord, SearchHit, USER_SENDER_TAG};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Request/response surface of the conversation backend.
///
/// Implementations hold no session logic: every method is one round-trip.
pub trait ChatBackend: Send + Sync {
    fn list_conversations<'a>(&'a self) -> BoxFuture<'a, ApiResult<Vec<ConversationSummary>>>;

    fn create_conversation<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, ApiResult<ConversationSummary>>;

    /// Delivers one user message and resolves to the assistant reply text.
    fn send_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message: &'a str,
    ) -> BoxFuture<'a, ApiResult<String>>;

    fn chat_history<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, ApiResult<Vec<HistoryRecord>>>;

    fn delete_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, ApiResult<()>>;

    fn rename_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        name: &'a str,
    ) -> BoxFuture<'a, ApiResult<ConversationSummary>>;

    fn search_messages<'a>(&'a self, query: &'a str) -> BoxFuture<'a, ApiResult<Vec<SearchHit>>>;
}
