//! Text output formatting.

use saferequest_fetch::{FetchAttempt, FetchOutcome};

const CHECK: &str = "✓";
const CROSS: &str = "✗";

/// Plain text formatter.
pub struct TextFormatter {
    name_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new() -> Self {
        Self { name_width: 26 }
    }

    /// The response body, or nothing when the fetch produced none.
    pub fn format_body(&self, outcome: &FetchOutcome) -> String {
        outcome
            .result
            .as_ref()
            .ok()
            .and_then(|envelope| envelope.body())
            .unwrap_or_default()
            .to_string()
    }

    /// One line per attempt plus a totals line.
    pub fn format_attempts(&self, outcome: &FetchOutcome) -> String {
        let mut lines: Vec<String> = outcome
            .attempts
            .iter()
            .map(|attempt| self.format_attempt(attempt))
            .collect();

        lines.push(format!(
            "{} {} in {} ms",
            outcome.tries,
            if outcome.tries == 1 { "try" } else { "tries" },
            outcome.duration.as_millis()
        ));
        lines.join("\n")
    }

    fn format_attempt(&self, attempt: &FetchAttempt) -> String {
        let mark = if attempt.success { CHECK } else { CROSS };
        let mut line = format!(
            "{mark} {:<width$} {:>6} ms",
            attempt.name,
            attempt.duration.as_millis(),
            width = self.name_width
        );
        if let Some(proxy) = &attempt.proxy {
            line.push_str(&format!(" via {proxy}"));
        }
        if let Some(error) = &attempt.error {
            line.push_str(&format!("  {error}"));
        }
        line
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}
