pub mod client;
pub mod error;
pub mod handlers;
pub mod init;
pub mod llm;
pub mod models;
pub mod relay;
pub mod retrieval;
pub mod state;

pub use crate::error::{AppError, ErrorCode, RetrievalError, UpstreamError};
pub use crate::init::{Config, LlmConfig, RetrievalConfig};
pub use crate::models::{ChatRequest, WireEvent};
pub use crate::state::AppState;
