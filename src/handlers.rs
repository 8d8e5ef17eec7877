use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, header};
use axum::response::sse::KeepAlive;
use axum::response::{IntoResponse, Response, Sse};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::AppState;
use crate::error::*;
use crate::llm::build_user_prompt;
use crate::models::ChatRequest;
use crate::relay::open_relay;

// ============================================================================
// ROUTER
// ============================================================================

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", axum::routing::post(chat_stream_handler))
        .route("/health", axum::routing::get(health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// ============================================================================
// SSE STREAM HANDLER
// ============================================================================

/// Handler for streaming chat answers
///
/// POST /api/chat
/// Body: `{"message": "..."}`
///
/// Returns: `data: {"content", "reasoning_content"}` events closed by
/// `data: [DONE]`, or a `{"error"}` JSON body if nothing was streamed yet.
pub async fn chat_stream_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let question = request
        .question()
        .ok_or_else(|| AppError::validation("Message is required"))?;

    let request_id = Uuid::now_v7().to_string();
    log::info!(
        "[{}] chat request ({} chars)",
        request_id,
        question.chars().count()
    );

    let reference = match &state.augmenter {
        Some(augmenter) => augmenter.augment(question).await,
        None => String::new(),
    };
    let user_prompt = build_user_prompt(question, &reference);

    let events = open_relay(&state, &user_prompt, request_id).await?;

    let sse = Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    );

    Ok((
        [(header::CONNECTION, HeaderValue::from_static("keep-alive"))],
        sse,
    )
        .into_response())
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
