// Public module exports
pub mod openai;
pub mod prompt;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::UpstreamError;

// Re-export main types for convenience
pub use openai::OpenAiCompatibleClient;
pub use prompt::{SYSTEM_PROMPT, build_user_prompt};

/// One incremental unit from the provider. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub content: Option<String>,
    pub reasoning_content: Option<String>,
}

impl Chunk {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            reasoning_content: None,
        }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            content: None,
            reasoning_content: Some(text.into()),
        }
    }
}

/// Lazy, finite, non-restartable sequence of chunks. Ends when the provider
/// closes the connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Chunk, UpstreamError>> + Send>>;

/// Boundary around the hosted chat-completion provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Opens one streaming completion. Rejections the provider reports before
    /// streaming starts come back as `Err` here rather than inside the stream.
    async fn stream_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<ChunkStream, UpstreamError>;
}
