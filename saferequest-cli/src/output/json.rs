//! JSON output formatting.

use anyhow::Result;
use saferequest_core::CookieJar;
use saferequest_fetch::{FetchAttempt, FetchOutcome};
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one fetch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutput<'a> {
    pub url: &'a str,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<&'a CookieJar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<&'a str>,
    pub tries: usize,
    pub duration_ms: u128,
    pub attempts: Vec<AttemptOutput<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One engine attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutput<'a> {
    pub engine: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<&'a str>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u128,
}

impl<'a> From<&'a FetchAttempt> for AttemptOutput<'a> {
    fn from(attempt: &'a FetchAttempt) -> Self {
        Self {
            engine: attempt.engine.id(),
            proxy: attempt.proxy.as_deref(),
            success: attempt.success,
            error: attempt.error.as_ref().map(ToString::to_string),
            duration_ms: attempt.duration.as_millis(),
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats the envelope and attempt history of one fetch.
    pub fn format_outcome(&self, url: &str, outcome: &FetchOutcome) -> Result<String> {
        self.format(&Self::to_output(url, outcome))
    }

    /// Converts an outcome to output.
    pub(crate) fn to_output<'a>(url: &'a str, outcome: &'a FetchOutcome) -> FetchOutput<'a> {
        let attempts = outcome.attempts.iter().map(AttemptOutput::from).collect();
        let duration_ms = outcome.duration.as_millis();

        match &outcome.result {
            Ok(envelope) => FetchOutput {
                url,
                succeeded: envelope.has_succeeded(),
                status_code: Some(envelope.status_code()),
                body: envelope.body(),
                json: envelope.json(),
                cookies: Some(envelope.cookies()),
                access_token: envelope.access_token(),
                tries: outcome.tries,
                duration_ms,
                attempts,
                error: None,
            },
            Err(e) => FetchOutput {
                url,
                succeeded: false,
                status_code: None,
                body: None,
                json: None,
                cookies: None,
                access_token: None,
                tries: outcome.tries,
                duration_ms,
                attempts,
                error: Some(e.to_string()),
            },
        }
    }
}
