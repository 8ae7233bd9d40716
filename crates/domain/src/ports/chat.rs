use crate::DomainResult;
use crate::chat::{ChatMessage, MessageWindow};

/// Append-only message store keyed by the service-request identifier.
pub trait ChatMessageRepository: Send + Sync {
    fn append(
        &self,
        message: &ChatMessage,
    ) -> crate::ports::BoxFuture<'_, DomainResult<ChatMessage>>;

    /// Messages for one conversation, ascending by `(created_at_ms,
    /// message_id)`.
    fn list_by_request(
        &self,
        request_id: &str,
        window: &MessageWindow,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Vec<ChatMessage>>>;
}
