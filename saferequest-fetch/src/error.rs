//! Fetch error types.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type surfaced to callers of the orchestrator and settings loader.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every engine in the chain failed and the caller asked for errors.
    #[error("All {failures} engine attempts failed, first error: {first}")]
    AllEnginesFailed {
        /// The error of the first chain position that failed.
        #[source]
        first: TransportError,
        /// Number of failed attempts.
        failures: usize,
    },

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] saferequest_core::CoreError),

    /// IO error while reading or writing settings.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Returns the first transport error when every engine failed.
    pub fn first_transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::AllEnginesFailed { first, .. } => Some(first),
            _ => None,
        }
    }
}

// ============================================================================
// Transport Error
// ============================================================================

/// One engine's attempt failed.
///
/// The orchestrator always catches these per attempt; they only reach the
/// caller wrapped in [`FetchError::AllEnginesFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The final response status was above 399.
    #[error("Failed to request {url} with status code {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Final status code.
        status: u16,
        /// Response text, when it could be read.
        body: Option<String>,
    },

    /// Connection, TLS, DNS or protocol failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The attempt exceeded its timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// An anti-bot challenge could not be passed.
    #[error("Challenge not solved: {0}")]
    Challenge(String),

    /// Headless browser launch or navigation failed.
    #[error("Browser error: {0}")]
    Browser(String),

    /// The blocking worker thread panicked or was cancelled.
    #[error("Worker thread failed: {0}")]
    Join(String),

    /// Headers, proxy or body could not be turned into a request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Classifies a reqwest error raised during an attempt bounded by `timeout`.
    pub fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// HTTP status of the failed response, if the failure had one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<chromiumoxide::error::CdpError> for TransportError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Browser(err.to_string())
    }
}

impl From<tokio::task::JoinError> for TransportError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}
