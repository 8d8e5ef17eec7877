// Public module exports
pub mod conversation;
pub mod decoder;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ErrorResponse;
use crate::models::ChatRequest;

// Re-export main types for convenience
pub use conversation::{ChatMessage, Conversation, ConversationError, Exchange, MessageRole};
pub use decoder::{EventDecoder, Frame};

// ============================================================================
// VIEW
// ============================================================================

/// Whatever renders the conversation. Called after every state change.
pub trait ConversationView {
    fn message_updated(&mut self, message: &ChatMessage);

    fn message_removed(&mut self, _id: Uuid) {}

    fn error_shown(&mut self, _error: &str) {}

    fn busy_changed(&mut self, _busy: bool) {}
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Network(String),

    #[error("The answer ended before it was complete")]
    Incomplete,

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

// ============================================================================
// STREAM READER
// ============================================================================

/// Applies the relay's event stream to the assistant message `id`, notifying
/// `view` after every event. Returns the number of events applied.
///
/// Stops at `[DONE]`. A body that ends or fails before `[DONE]` is an error.
pub async fn read_event_stream<S, E>(
    mut body: S,
    conversation: &mut Conversation,
    id: Uuid,
    view: &mut dyn ConversationView,
) -> Result<usize, ClientError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: fmt::Display,
{
    let mut decoder = EventDecoder::new();
    let mut applied = 0;

    loop {
        let (frames, ended) = match body.next().await {
            Some(Ok(bytes)) => (decoder.push(&bytes), false),
            Some(Err(e)) => return Err(ClientError::Network(e.to_string())),
            None => (decoder.finish(), true),
        };

        for frame in frames {
            match frame {
                Frame::Done => return Ok(applied),
                Frame::Event(event) => {
                    let message = conversation.apply_event(id, &event)?;
                    view.message_updated(message);
                    applied += 1;
                }
            }
        }

        if ended {
            return Err(ClientError::Incomplete);
        }
    }
}

// ============================================================================
// CHAT CLIENT
// ============================================================================

/// Talks to `POST /api/chat` and keeps a [`Conversation`] in sync.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Runs one exchange. On failure the assistant placeholder is rolled back
    /// and the error is shown; the same error is returned.
    pub async fn send(
        &self,
        conversation: &mut Conversation,
        input: &str,
        view: &mut dyn ConversationView,
    ) -> Result<(), ClientError> {
        let exchange = conversation.begin_exchange(input)?;
        view.busy_changed(true);
        for id in [exchange.user_id, exchange.assistant_id] {
            if let Some(message) = conversation.message(id) {
                view.message_updated(message);
            }
        }

        let id = exchange.assistant_id;
        let result = self.exchange(conversation, &exchange, view).await;

        match &result {
            Ok(events) => {
                log::debug!("Answer complete after {} events", events);
                if let Err(e) = conversation.complete(id) {
                    log::warn!("Completing message {} failed: {}", id, e);
                }
            }
            Err(e) => {
                log::error!("Chat exchange failed: {}", e);
                conversation.rollback(id, e.to_string());
                view.message_removed(id);
                view.error_shown(&e.to_string());
            }
        }
        view.busy_changed(false);

        result.map(|_| ())
    }

    async fn exchange(
        &self,
        conversation: &mut Conversation,
        exchange: &Exchange,
        view: &mut dyn ConversationView,
    ) -> Result<usize, ClientError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&ChatRequest::new(exchange.question.clone()))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("Failed to get response ({})", status));
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = Box::pin(response.bytes_stream());
        read_event_stream(body, conversation, exchange.assistant_id, view).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
