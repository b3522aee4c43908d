//! CLI output formatting tests.

use saferequest_core::{CookieJar, ResponseEnvelope};
use saferequest_fetch::{EngineKind, FetchAttempt, FetchError, FetchOutcome, TransportError};
use std::time::Duration;

fn failed_attempt() -> FetchAttempt {
    FetchAttempt::failure(
        EngineKind::AntiBotScraper,
        "Anti-Bot Scraper",
        Some("http://10.0.0.1:3128".to_string()),
        TransportError::Challenge("turnstile".to_string()),
        Duration::from_millis(40),
    )
}

fn success_outcome() -> FetchOutcome {
    FetchOutcome {
        result: Ok(ResponseEnvelope::new(r#"{"line":"7"}"#, 200)
            .with_cookies(CookieJar::parse("sid=abc"))
            .with_access_token(Some("tok".to_string()))),
        errors: vec![TransportError::Challenge("turnstile".to_string())],
        attempts: vec![
            failed_attempt(),
            FetchAttempt::success(
                EngineKind::DirectAsync,
                "Direct Async",
                None,
                Duration::from_millis(12),
            ),
        ],
        tries: 2,
        duration: Duration::from_millis(60),
    }
}

mod text_formatter_tests {
    use super::*;
    use crate::output::TextFormatter;

    #[test]
    fn test_body_of_success() {
        let formatter = TextFormatter::new();
        assert_eq!(formatter.format_body(&success_outcome()), r#"{"line":"7"}"#);
    }

    #[test]
    fn test_body_of_silent_failure_is_empty() {
        let outcome = FetchOutcome {
            result: Ok(ResponseEnvelope::default()),
            errors: Vec::new(),
            attempts: Vec::new(),
            tries: 0,
            duration: Duration::ZERO,
        };
        assert_eq!(TextFormatter::new().format_body(&outcome), "");
    }

    #[test]
    fn test_attempt_lines() {
        let text = TextFormatter::new().format_attempts(&success_outcome());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("✗ Anti-Bot Scraper"));
        assert!(lines[0].contains("via http://10.0.0.1:3128"));
        assert!(lines[0].contains("turnstile"));
        assert!(lines[1].starts_with("✓ Direct Async"));
        assert_eq!(lines[2], "2 tries in 60 ms");
    }
}

mod json_formatter_tests {
    use super::*;
    use crate::output::JsonFormatter;

    #[test]
    fn test_success_output() {
        let json = JsonFormatter::new(false)
            .format_outcome("https://bus.example.com", &success_outcome())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["succeeded"], true);
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["json"]["line"], "7");
        assert_eq!(value["cookies"]["sid"], "abc");
        assert_eq!(value["accessToken"], "tok");
        assert_eq!(value["attempts"][0]["engine"], "anti_bot_scraper");
        assert_eq!(value["attempts"][0]["success"], false);
        assert_eq!(value["attempts"][1]["durationMs"], 12);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_error_output() {
        let outcome = FetchOutcome {
            result: Err(FetchError::AllEnginesFailed {
                first: TransportError::Challenge("turnstile".to_string()),
                failures: 1,
            }),
            errors: vec![TransportError::Challenge("turnstile".to_string())],
            attempts: vec![failed_attempt()],
            tries: 1,
            duration: Duration::from_millis(40),
        };
        let json = JsonFormatter::new(true)
            .format_outcome("https://bus.example.com", &outcome)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["succeeded"], false);
        assert!(value.get("statusCode").is_none());
        assert!(value["error"].as_str().unwrap().contains("turnstile"));
    }
}
