use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;

use crate::AppState;
use crate::error::UpstreamError;
use crate::llm::ChunkStream;
use crate::models::WireEvent;

/// Payload of the terminal event: `data: [DONE]`.
pub const DONE_SENTINEL: &str = "[DONE]";

pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event, UpstreamError>> + Send>>;

// ============================================================================
// OPEN
// ============================================================================

/// Opens the upstream completion and waits for its first non-empty chunk
/// before any response bytes are committed, so early provider failures can
/// still be answered with a plain JSON error.
///
/// Opening and every wait for a chunk are bounded by the idle timeout.
pub async fn open_relay(
    state: &AppState,
    user_prompt: &str,
    request_id: String,
) -> Result<EventStream, UpstreamError> {
    let idle_timeout = state.idle_timeout;
    let opening = state.llm.stream_completion(&state.system_prompt, user_prompt);
    let mut chunks = match tokio::time::timeout(idle_timeout, opening).await {
        Ok(opened) => opened?,
        Err(_) => return Err(UpstreamError::IdleTimeout(idle_timeout)),
    };

    // Role-only and other empty chunks carry nothing to relay.
    let first = loop {
        match tokio::time::timeout(idle_timeout, chunks.next()).await {
            Ok(Some(Ok(chunk))) => {
                if WireEvent::from_chunk(chunk.clone()).is_some() {
                    break Some(chunk);
                }
            }
            Ok(Some(Err(e))) => return Err(e),
            Ok(None) => break None,
            Err(_) => return Err(UpstreamError::IdleTimeout(idle_timeout)),
        }
    };

    let chunks: ChunkStream = match first {
        Some(chunk) => Box::pin(futures::stream::once(async move { Ok(chunk) }).chain(chunks)),
        None => Box::pin(futures::stream::empty()),
    };

    Ok(relay_events(chunks, idle_timeout, request_id))
}

// ============================================================================
// RELAY
// ============================================================================

/// Re-frames upstream chunks as wire events.
///
/// Empty chunks are dropped. A clean end of the upstream sequence is followed
/// by exactly one `[DONE]` event. Any upstream failure, including a gap longer
/// than `idle_timeout`, ends the stream with an error and no `[DONE]`, which
/// makes the server abort the connection.
pub fn relay_events(
    chunks: ChunkStream,
    idle_timeout: Duration,
    request_id: String,
) -> EventStream {
    let stream = async_stream::stream! {
        let mut guard = RelayGuard::new(request_id);
        let mut chunks = Box::pin(tokio_stream::StreamExt::timeout(chunks, idle_timeout));
        let mut failure = None;

        while let Some(item) = chunks.next().await {
            let chunk = match item {
                Ok(Ok(chunk)) => chunk,
                Ok(Err(e)) => {
                    failure = Some(e);
                    break;
                }
                Err(_elapsed) => {
                    failure = Some(UpstreamError::IdleTimeout(idle_timeout));
                    break;
                }
            };

            let Some(event) = WireEvent::from_chunk(chunk) else {
                continue;
            };

            match Event::default().json_data(&event) {
                Ok(frame) => {
                    guard.sent += 1;
                    yield Ok(frame);
                }
                Err(e) => {
                    failure = Some(UpstreamError::Encode(e.to_string()));
                    break;
                }
            }
        }

        guard.finished = true;
        match failure {
            Some(e) => {
                log::error!(
                    "[{}] upstream failed after {} events, aborting: {}",
                    guard.request_id,
                    guard.sent,
                    e
                );
                yield Err(e);
            }
            None => {
                log::info!(
                    "[{}] stream finished with {} events",
                    guard.request_id,
                    guard.sent
                );
                yield Ok(Event::default().data(DONE_SENTINEL));
            }
        }
    };

    Box::pin(stream)
}

// Dropped without `finished` means the client went away mid-stream, which is
// a normal way for an exchange to end.
struct RelayGuard {
    request_id: String,
    sent: usize,
    finished: bool,
}

impl RelayGuard {
    fn new(request_id: String) -> Self {
        Self {
            request_id,
            sent: 0,
            finished: false,
        }
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!(
                "[{}] client disconnected after {} events",
                self.request_id,
                self.sent
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
