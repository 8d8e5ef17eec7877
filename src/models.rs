use serde::{Deserialize, Serialize};

use crate::llm::Chunk;

// ============================================================================
// Chat endpoint
// ============================================================================

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// The question, if one was actually supplied.
    pub fn question(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

/// One relayed frame: `data: {"content": "...", "reasoning_content": "..."}`.
///
/// Both fields are always present on the wire; at least one is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct WireEvent {
    pub content: String,
    pub reasoning_content: String,
}

impl WireEvent {
    pub fn new(content: impl Into<String>, reasoning_content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            reasoning_content: reasoning_content.into(),
        }
    }

    /// Re-frames an upstream chunk. Chunks carrying neither field yield `None`.
    pub fn from_chunk(chunk: Chunk) -> Option<Self> {
        let event = Self {
            content: chunk.content.unwrap_or_default(),
            reasoning_content: chunk.reasoning_content.unwrap_or_default(),
        };
        if event.is_empty() { None } else { Some(event) }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.reasoning_content.is_empty()
    }
}

// ============================================================================
// Retrieval service
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDocument {
    #[serde(rename = "content")]
    pub text: String,
    #[serde(rename = "score")]
    pub relevance_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RetrievalResponse {
    #[serde(default)]
    pub documents: Vec<RetrievedDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
