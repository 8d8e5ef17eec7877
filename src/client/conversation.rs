use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::WireEvent;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn user(content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::User,
            content,
            reasoning_content: None,
            created_at: Utc::now(),
        }
    }

    fn assistant_placeholder() -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::Assistant,
            content: String::new(),
            reasoning_content: Some(String::new()),
            created_at: Utc::now(),
        }
    }

    pub fn reasoning(&self) -> &str {
        self.reasoning_content.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("An answer is still being generated")]
    Busy,

    #[error("Message is empty")]
    EmptyInput,

    #[error("Message {0} is not streaming")]
    NotStreaming(Uuid),
}

/// Handle for the exchange started by [`Conversation::begin_exchange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub user_id: Uuid,
    pub assistant_id: Uuid,
    pub question: String,
}

/// Chronological message list plus the UI flags around it.
///
/// Append-only, except that a failed exchange removes its assistant
/// placeholder. Only the in-flight assistant message can be mutated.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    in_flight: Option<Uuid>,
    error: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn message(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// True while submission is disabled.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Current error banner, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Appends the user turn and an empty assistant turn, and locks
    /// submission until the exchange completes or is rolled back.
    pub fn begin_exchange(&mut self, input: &str) -> Result<Exchange, ConversationError> {
        if self.is_busy() {
            return Err(ConversationError::Busy);
        }
        let question = input.trim();
        if question.is_empty() {
            return Err(ConversationError::EmptyInput);
        }

        let user = ChatMessage::user(question.to_string());
        let assistant = ChatMessage::assistant_placeholder();
        let exchange = Exchange {
            user_id: user.id,
            assistant_id: assistant.id,
            question: question.to_string(),
        };

        self.messages.push(user);
        self.messages.push(assistant);
        self.in_flight = Some(exchange.assistant_id);
        self.error = None;

        Ok(exchange)
    }

    pub fn apply_event(
        &mut self,
        id: Uuid,
        event: &WireEvent,
    ) -> Result<&ChatMessage, ConversationError> {
        if self.in_flight != Some(id) {
            return Err(ConversationError::NotStreaming(id));
        }
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(ConversationError::NotStreaming(id))?;

        message.content.push_str(&event.content);
        message
            .reasoning_content
            .get_or_insert_with(String::new)
            .push_str(&event.reasoning_content);

        Ok(message)
    }

    /// Freezes the assistant message and re-enables submission.
    pub fn complete(&mut self, id: Uuid) -> Result<(), ConversationError> {
        if self.in_flight != Some(id) {
            return Err(ConversationError::NotStreaming(id));
        }
        self.in_flight = None;
        Ok(())
    }

    /// Drops the assistant placeholder, shows `error` and re-enables
    /// submission. The user turn stays.
    pub fn rollback(&mut self, id: Uuid, error: impl Into<String>) {
        self.messages.retain(|m| m.id != id);
        if self.in_flight == Some(id) {
            self.in_flight = None;
        }
        self.error = Some(error.into());
    }
}
