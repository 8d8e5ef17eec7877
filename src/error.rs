use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Main Error Type
// ============================================================================

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    // Convenience constructors
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Upstream(status), message)
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::GatewayTimeout, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

// ============================================================================
// Error Codes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Client errors (4xx)
    BadRequest,
    ValidationError,

    // Server errors (5xx)
    Internal,
    GatewayTimeout,

    /// Status reported by the LLM provider when it rejected the request.
    Upstream(u16),
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::ValidationError => 400,
            Self::Internal => 500,
            Self::GatewayTimeout => 504,
            Self::Upstream(status) if (400..=599).contains(status) => *status,
            Self::Upstream(_) => 500,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.http_status() >= 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ValidationError => write!(f, "VALIDATION_ERROR"),
            Self::Internal => write!(f, "INTERNAL_ERROR"),
            Self::GatewayTimeout => write!(f, "GATEWAY_TIMEOUT"),
            Self::Upstream(status) => write!(f, "UPSTREAM_{}", status),
        }
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

pub type Result<T> = std::result::Result<T, AppError>;

// ============================================================================
// Error Response for HTTP
// ============================================================================

/// Body of every non-streaming error response: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            error: error.message.clone(),
        }
    }
}

// ============================================================================
// Collaborator Errors
// ============================================================================

/// Failure talking to the hosted chat-completion provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("connection to provider failed: {0}")]
    Transport(String),

    #[error("undecodable chunk from provider: {0}")]
    Decode(String),

    #[error("no chunk received from provider within {0:?}")]
    IdleTimeout(Duration),

    #[error("failed to encode relay event: {0}")]
    Encode(String),
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Rejected {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Transport(err.to_string()),
        }
    }
}

/// Failure talking to the retrieval service. Never reaches the user: the
/// augmenter logs it and continues without reference material.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retrieval request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("retrieval service answered with status {0}")]
    Status(u16),

    #[error("malformed retrieval payload: {0}")]
    Payload(String),
}

// ============================================================================
// Error Conversion Implementations
// ============================================================================

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Rejected { status, message } => {
                Self::upstream(status, format!("API error: {}", message))
            }
            UpstreamError::IdleTimeout(_) => Self::gateway_timeout(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

// ============================================================================
// Backend-specific HTTP Response Conversion
// ============================================================================

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::StatusCode;

        log_error(&self);

        let status = StatusCode::from_u16(self.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn log_error(error: &AppError) {
    if error.code.is_server_error() {
        log::error!("{}", error);
    } else {
        log::warn!("{}", error);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::ValidationError.http_status(), 400);
        assert_eq!(ErrorCode::Internal.http_status(), 500);
        assert_eq!(ErrorCode::Upstream(429).http_status(), 429);
        assert_eq!(ErrorCode::Upstream(200).http_status(), 500);
        assert_eq!(ErrorCode::Upstream(0).http_status(), 500);
    }

    #[test]
    fn test_error_classification() {
        assert!(!ErrorCode::BadRequest.is_server_error());
        assert!(!ErrorCode::Upstream(401).is_server_error());
        assert!(ErrorCode::Internal.is_server_error());
        assert!(ErrorCode::GatewayTimeout.is_server_error());
    }

    #[test]
    fn test_upstream_rejection_keeps_status() {
        let err: AppError = UpstreamError::Rejected {
            status: 401,
            message: "Invalid token".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::Upstream(401));
        assert_eq!(err.message, "API error: Invalid token");
    }

    #[test]
    fn test_transport_failure_is_internal() {
        let err: AppError = UpstreamError::Transport("connection reset".to_string()).into();
        assert_eq!(err.code.http_status(), 500);
        assert!(err.message.contains("connection reset"));
    }

    #[test]
    fn test_idle_timeout_is_gateway_timeout() {
        let err: AppError = UpstreamError::IdleTimeout(Duration::from_secs(60)).into();
        assert_eq!(err.code, ErrorCode::GatewayTimeout);
        assert_eq!(err.code.http_status(), 504);
    }

    #[test]
    fn test_error_display() {
        let err = AppError::validation("Message is required");
        let display = format!("{}", err);
        assert!(display.contains("VALIDATION_ERROR"));
        assert!(display.contains("Message is required"));
    }

    #[tokio::test]
    async fn test_response_body_shape() {
        let response = AppError::validation("Message is required").into_response();
        assert_eq!(response.status().as_u16(), 400);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Message is required" }));
    }
}
