use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RetrievalError;
use crate::init::RetrievalConfig;
use crate::models::{RetrievalRequest, RetrievalResponse, RetrievedDocument};

// ============================================================================
// RETRIEVER
// ============================================================================

/// External document retrieval collaborator.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<RetrievalResponse, RetrievalError>;
}

/// `POST {url}` with `{"query": ...}`, expecting `{"documents": [...]}`.
pub struct HttpRetriever {
    client: Client,
    url: String,
}

impl HttpRetriever {
    pub fn new(config: &RetrievalConfig) -> Result<Self, RetrievalError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn retrieve(&self, query: &str) -> Result<RetrievalResponse, RetrievalError> {
        let response = self
            .client
            .post(&self.url)
            .json(&RetrievalRequest {
                query: query.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| RetrievalError::Payload(e.to_string()))
    }
}

// ============================================================================
// AUGMENTER
// ============================================================================

/// Turns a question into a block of reference material.
///
/// Every failure degrades to an empty block: answering without retrieved
/// context is preferred over failing the chat request, so errors are logged
/// and never propagated or retried.
#[derive(Clone)]
pub struct RetrievalAugmenter {
    retriever: Arc<dyn Retriever>,
    max_documents: usize,
    timeout: Duration,
}

impl RetrievalAugmenter {
    pub fn new(retriever: Arc<dyn Retriever>, max_documents: usize, timeout: Duration) -> Self {
        Self {
            retriever,
            max_documents,
            timeout,
        }
    }

    pub async fn augment(&self, question: &str) -> String {
        let retrieval = self.retriever.retrieve(question);
        let response = match tokio::time::timeout(self.timeout, retrieval).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                log::warn!("Retrieval failed, answering without reference material: {}", e);
                return String::new();
            }
            Err(_) => {
                log::warn!(
                    "Retrieval exceeded {:?}, answering without reference material",
                    self.timeout
                );
                return String::new();
            }
        };

        if let Some(warning) = &response.warning {
            log::info!("Retrieval service warning: {}", warning);
        }

        let documents: Vec<RetrievedDocument> = response
            .documents
            .into_iter()
            .filter(|doc| !doc.text.trim().is_empty())
            .take(self.max_documents)
            .collect();

        log::info!("Folding {} retrieved documents into the prompt", documents.len());
        format_documents(&documents)
    }
}

/// Renders documents in received order, each labelled with its 1-based
/// position and a 4-decimal relevance score.
pub fn format_documents(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "Document {} (score: {:.4}):\n{}",
                i + 1,
                doc.relevance_score,
                doc.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ============================================================================
// TESTS
// ============================================================================
