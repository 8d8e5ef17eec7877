use std::sync::Arc;
use std::time::Duration;

use crate::llm::LlmClient;
use crate::retrieval::RetrievalAugmenter;

// ============================================================================
// AppState
// ============================================================================

/// Collaborators shared by every request. Nothing here is mutated after
/// startup; each request opens its own upstream stream.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LlmClient>,
    pub augmenter: Option<RetrievalAugmenter>,
    pub system_prompt: String,
    /// Longest wait tolerated between two upstream chunks.
    pub idle_timeout: Duration,
}
