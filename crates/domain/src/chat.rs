use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::chat::ChatMessageRepository;
use crate::requests::RequestService;
use crate::util::{now_ms, uuid_v7_without_dashes};

pub const MAX_MESSAGE_LENGTH: usize = 2000;
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const MAX_HISTORY_LIMIT: usize = 500;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: String,
    pub request_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub created_at_ms: i64,
}

/// History filter: messages strictly newer than `since_ms`, oldest first,
/// at most `limit` of them.
#[derive(Clone, Copy, Debug)]
pub struct MessageWindow {
    pub since_ms: Option<i64>,
    pub limit: usize,
}

impl MessageWindow {
    pub fn new(since_ms: Option<i64>, limit: Option<usize>) -> Self {
        Self {
            since_ms,
            limit: limit
                .unwrap_or(DEFAULT_HISTORY_LIMIT)
                .clamp(1, MAX_HISTORY_LIMIT),
        }
    }
}

impl Default for MessageWindow {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Clone)]
pub struct ChatService {
    messages: Arc<dyn ChatMessageRepository>,
    requests: RequestService,
}

impl ChatService {
    pub fn new(messages: Arc<dyn ChatMessageRepository>, requests: RequestService) -> Self {
        Self { messages, requests }
    }

    /// Persists the message, then flips an open request into negotiation.
    /// The flip happens after the append; a crash between the two leaves an
    /// open request with history, which the next message repairs.
    pub async fn send(
        &self,
        sender_id: &str,
        sender_name: &str,
        request_id: &str,
        content: &str,
    ) -> DomainResult<ChatMessage> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DomainError::Validation("message must not be empty".into()));
        }
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(DomainError::Validation(format!(
                "message exceeds {MAX_MESSAGE_LENGTH} characters"
            )));
        }

        // Also verifies the request exists.
        self.requests.get(request_id).await?;

        let message = ChatMessage {
            message_id: uuid_v7_without_dashes(),
            request_id: request_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            content: content.to_string(),
            created_at_ms: now_ms(),
        };
        let message = self.messages.append(&message).await?;

        self.requests.begin_negotiation(sender_id, request_id).await?;

        Ok(message)
    }

    pub async fn history(
        &self,
        request_id: &str,
        window: MessageWindow,
    ) -> DomainResult<Vec<ChatMessage>> {
        self.requests.get(request_id).await?;
        self.messages.list_by_request(request_id, &window).await
    }
}
