//! Core error types for `SafeRequest`.

use thiserror::Error;

/// Core error type for `SafeRequest` value types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unknown HTTP method name.
    #[error("Invalid request method: {0}")]
    InvalidMethod(String),

    /// Unknown engine name.
    #[error("Invalid engine kind: {0}")]
    InvalidEngine(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
