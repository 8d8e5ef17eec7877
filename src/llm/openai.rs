use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;
use crate::init::LlmConfig;
use crate::llm::{Chunk, ChunkStream, LlmClient};

// ============================================================================
// REQUEST / RESPONSE SHAPES
// ============================================================================

#[derive(Serialize, Debug)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize, Debug)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize, Debug)]
struct CompletionChoice {
    #[serde(default)]
    delta: CompletionDelta,
}

// `reasoning_content` is the DeepSeek-R1 extension; other models omit it.
#[derive(Deserialize, Debug, Default)]
struct CompletionDelta {
    content: Option<String>,
    reasoning_content: Option<String>,
}

// ============================================================================
// CLIENT
// ============================================================================

/// Streaming client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatibleClient {
    client: Client,
    config: LlmConfig,
}

impl OpenAiCompatibleClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn stream_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<ChunkStream, UpstreamError> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages: [
                CompletionMessage {
                    role: "system",
                    content: system_prompt,
                },
                CompletionMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: true,
        };

        log::info!(
            "Opening completion stream at {} using model {}",
            self.config.base_url,
            self.config.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            log::error!("Provider rejected completion request ({}): {}", status, raw);
            return Err(UpstreamError::Rejected {
                status: status.as_u16(),
                message: provider_error_message(&raw, status),
            });
        }

        let mut events = response.bytes_stream().eventsource();

        let chunks = async_stream::stream! {
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(UpstreamError::Transport(e.to_string()));
                        break;
                    }
                };

                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == "[DONE]" {
                    log::debug!("Provider signalled [DONE]");
                    break;
                }

                match parse_chunk(data) {
                    Ok(Some(chunk)) => yield Ok(chunk),
                    // keep-alive pings and usage-only frames
                    Ok(None) => continue,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(chunks))
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn parse_chunk(data: &str) -> Result<Option<Chunk>, UpstreamError> {
    let chunk: CompletionChunk = serde_json::from_str(data).map_err(|e| {
        log::warn!("Failed to parse provider chunk: {} - Data: {}", e, data);
        UpstreamError::Decode(e.to_string())
    })?;

    Ok(chunk.choices.into_iter().next().map(|choice| Chunk {
        content: choice.delta.content,
        reasoning_content: choice.delta.reasoning_content,
    }))
}

/// Pulls a readable message out of an OpenAI-style (`{"error":{"message"}}`)
/// or flat (`{"message"}`) error body, falling back to the raw text.
fn provider_error_message(raw: &str, status: reqwest::StatusCode) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(raw).ok();
    let message = parsed.as_ref().and_then(|value| {
        value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .or_else(|| value.get("error"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });

    match message {
        Some(message) => message,
        None if raw.trim().is_empty() => format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("error")
        ),
        None => raw.trim().to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
