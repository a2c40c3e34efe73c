//! Error types for the BrightLocal crate

use thiserror::Error;

/// Result type for BrightLocal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for BrightLocal operations
///
/// HTTP-level failures reported by the API (4xx/5xx) are not errors: they come
/// back as an [`ApiResponse`](crate::ApiResponse) whose `is_success()` is false.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Batch operation error
    #[error("Batch error: {0}")]
    Batch(String),
}
