//! The uniform response envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::cookies::CookieJar;

/// Status code of the envelope returned when no engine produced a response.
pub const DEFAULT_STATUS_CODE: u16 = 400;

/// Highest status code still considered a success.
pub const MAX_SUCCESS_STATUS: u16 = 399;

// ============================================================================
// Response Envelope
// ============================================================================

/// Result of one fetch, independent of the transport that produced it.
///
/// Envelopes are immutable once built. The domain layer only ever reads
/// [`body`](Self::body), [`has_succeeded`](Self::has_succeeded) and
/// [`json`](Self::json).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    body: Option<String>,
    status_code: u16,
    #[serde(default)]
    cookies: CookieJar,
    #[serde(default)]
    access_token: Option<String>,
}

impl ResponseEnvelope {
    /// Creates an envelope with a body and status code.
    pub fn new(body: impl Into<String>, status_code: u16) -> Self {
        Self {
            body: Some(body.into()),
            status_code,
            cookies: CookieJar::new(),
            access_token: None,
        }
    }

    /// Creates an envelope without a body.
    pub fn without_body(status_code: u16) -> Self {
        Self {
            body: None,
            status_code,
            cookies: CookieJar::new(),
            access_token: None,
        }
    }

    /// Attaches the cookies the response set.
    #[must_use]
    pub fn with_cookies(mut self, cookies: CookieJar) -> Self {
        self.cookies = cookies;
        self
    }

    /// Attaches a bearer token taken from the response.
    #[must_use]
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    /// Response text, if any.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// HTTP status code.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Cookies set by the response.
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Bearer token from an `Authorization` response header.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// True when the status is at most 399 and a body is present.
    pub fn has_succeeded(&self) -> bool {
        self.status_code <= MAX_SUCCESS_STATUS && self.body.is_some()
    }

    /// Parses the body as JSON, or `None` when absent or malformed.
    pub fn json(&self) -> Option<serde_json::Value> {
        self.json_as()
    }

    /// Deserializes the body into `T`, or `None` when absent or malformed.
    pub fn json_as<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_str(self.body.as_deref()?).ok()
    }

    /// Consumes the envelope and returns the body.
    pub fn into_body(self) -> Option<String> {
        self.body
    }
}

impl Default for ResponseEnvelope {
    /// The envelope returned when nothing was fetched.
    fn default() -> Self {
        Self::without_body(DEFAULT_STATUS_CODE)
    }
}

// ============================================================================
// Tests
// ============================================================================
