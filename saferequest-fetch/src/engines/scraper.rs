//! Anti-bot scraping engine.
//!
//! Sends browser-shaped navigation requests and recognises the common
//! interstitials served by CDN bot protection. JavaScript "checking your
//! browser" pages that clear themselves after a delay are waited out and
//! the request is re-issued with the cookies the interstitial set. Captcha
//! and turnstile challenges cannot be passed without a browser and fail the
//! attempt so the chain moves on.

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy};
use saferequest_core::{CookieJar, ResponseEnvelope};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::direct::MAX_REDIRECTS;
use super::{finish, header_map, http_method, response_cookies};
use crate::engine::{EngineKind, EngineRequest, RequestEngine};
use crate::error::TransportError;

/// Interstitial rounds waited out before giving up.
pub const MAX_CHALLENGE_ROUNDS: usize = 2;

/// Wait used when the interstitial does not state one.
const DEFAULT_CHALLENGE_DELAY: Duration = Duration::from_secs(5);

/// Upper bound on a stated interstitial wait.
const MAX_CHALLENGE_DELAY: Duration = Duration::from_secs(15);

/// Status codes bot protection answers with.
const CHALLENGE_STATUSES: &[u16] = &[403, 429, 503];

/// Markers of a self-clearing JavaScript interstitial.
const INTERSTITIAL_MARKERS: &[&str] = &[
    "jschl_vc",
    "jschl-answer",
    "cf_chl_opt",
    "Just a moment...",
    "Checking your browser",
    "DDoS protection by",
];

/// Markers of an interactive challenge.
const CAPTCHA_MARKERS: &[&str] = &[
    "cf-turnstile",
    "cf_captcha_kind",
    "h-captcha",
    "g-recaptcha",
    "challenges.cloudflare.com/turnstile",
];

/// `setTimeout(function(){ ... }, 4000)` in the interstitial script.
static CHALLENGE_DELAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)setTimeout\(\s*function\s*\(\)\s*\{.*?\}\s*,\s*(\d{3,6})\s*\)")
        .expect("Invalid regex")
});

/// Navigation headers a real browser sends on a top-level load.
const NAVIGATION_HEADERS: &[(&str, &str)] = &[
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
];

// ============================================================================
// Challenge Classification
// ============================================================================

/// What kind of anti-bot page a response is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Challenge {
    /// A normal response.
    None,
    /// A JavaScript wait page that clears itself after `delay`.
    Interstitial {
        /// How long to wait before re-requesting.
        delay: Duration,
    },
    /// A captcha or turnstile that needs a human or a browser.
    Captcha,
}

/// Classifies a response by status, `Server` header and body.
pub fn classify(status: u16, server: Option<&str>, body: &str) -> Challenge {
    if !CHALLENGE_STATUSES.contains(&status) {
        return Challenge::None;
    }

    let protected = server.is_some_and(|s| s.to_ascii_lowercase().contains("cloudflare"))
        || body.contains("/cdn-cgi/");
    let interstitial = INTERSTITIAL_MARKERS.iter().any(|marker| body.contains(marker));

    if (protected || interstitial) && CAPTCHA_MARKERS.iter().any(|marker| body.contains(marker)) {
        return Challenge::Captcha;
    }

    if interstitial {
        return Challenge::Interstitial {
            delay: challenge_delay(body),
        };
    }

    Challenge::None
}

/// Reads the wait from the interstitial script, capped.
fn challenge_delay(body: &str) -> Duration {
    CHALLENGE_DELAY_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map_or(DEFAULT_CHALLENGE_DELAY, Duration::from_millis)
        .min(MAX_CHALLENGE_DELAY)
}

/// Adds browser navigation headers the caller did not set.
pub(crate) fn fill_navigation_headers(headers: &mut HeaderMap) {
    for &(name, value) in NAVIGATION_HEADERS {
        headers
            .entry(HeaderName::from_static(name))
            .or_insert(HeaderValue::from_static(value));
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Scraping client that passes self-clearing bot interstitials.
#[derive(Debug, Clone)]
pub struct AntiBotScraperClient {
    max_rounds: usize,
}

impl AntiBotScraperClient {
    /// Creates the engine with the default round limit.
    pub fn new() -> Self {
        Self {
            max_rounds: MAX_CHALLENGE_ROUNDS,
        }
    }

    /// Sets how many interstitials are waited out per attempt.
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Builds a client for one attempt, routed through `proxy` if given.
    fn client(proxy: Option<&str>, timeout: Duration) -> Result<Client, TransportError> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .redirect(Policy::limited(MAX_REDIRECTS));

        if let Some(proxy) = proxy {
            let proxy = Proxy::all(proxy)
                .map_err(|e| TransportError::InvalidRequest(format!("proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| TransportError::from_reqwest(&e, timeout))
    }
}

impl Default for AntiBotScraperClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestEngine for AntiBotScraperClient {
    fn kind(&self) -> EngineKind {
        EngineKind::AntiBotScraper
    }

    #[instrument(skip(self, request), fields(url = %request.url, method = %request.method))]
    async fn request(&self, request: &EngineRequest) -> Result<ResponseEnvelope, TransportError> {
        let client = Self::client(request.proxy.as_deref(), request.timeout)?;
        let mut headers = header_map(&request.headers)?;
        fill_navigation_headers(&mut headers);

        // Interstitial waits count against the attempt timeout.
        tokio::time::timeout(request.timeout, self.run_rounds(&client, request, headers))
            .await
            .unwrap_or(Err(TransportError::Timeout(request.timeout)))
    }
}

impl AntiBotScraperClient {
    /// Sends the request, waiting out interstitials until a page comes back.
    async fn run_rounds(
        &self,
        client: &Client,
        request: &EngineRequest,
        mut headers: HeaderMap,
    ) -> Result<ResponseEnvelope, TransportError> {
        // Session cookies sent by the caller, plus whatever interstitials set.
        let session = request
            .header("cookie")
            .map(CookieJar::parse)
            .unwrap_or_default();
        let mut collected = CookieJar::new();
        let mut rounds = 0;

        loop {
            if !collected.is_empty() {
                let mut jar = session.clone();
                jar.merge(&collected);
                let value = HeaderValue::from_str(&jar.to_header())
                    .map_err(|e| TransportError::InvalidRequest(format!("cookie header: {e}")))?;
                headers.insert(header::COOKIE, value);
            }

            let mut call = client
                .request(http_method(request.method), &request.url)
                .headers(headers.clone());
            if let Some(body) = &request.body {
                call = call.json(body);
            }

            let response = call
                .send()
                .await
                .map_err(|e| TransportError::from_reqwest(&e, request.timeout))?;

            let status = response.status().as_u16();
            let response_headers = response.headers().clone();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::from_reqwest(&e, request.timeout))?;

            collected.merge(&response_cookies(&response_headers));
            let server = response_headers
                .get(header::SERVER)
                .and_then(|v| v.to_str().ok());

            match classify(status, server, &body) {
                Challenge::None => {
                    let envelope = finish(&request.url, status, &response_headers, body)?;
                    collected.merge(envelope.cookies());
                    return Ok(envelope.with_cookies(collected));
                }
                Challenge::Captcha => {
                    return Err(TransportError::Challenge(format!(
                        "interactive challenge at {} (status {status})",
                        request.url
                    )));
                }
                Challenge::Interstitial { delay } => {
                    if rounds >= self.max_rounds {
                        return Err(TransportError::Challenge(format!(
                            "interstitial at {} persisted after {rounds} rounds",
                            request.url
                        )));
                    }
                    rounds += 1;
                    info!(round = rounds, delay = ?delay, "Waiting out interstitial");
                    tokio::time::sleep(delay).await;
                    debug!(cookies = collected.len(), "Re-issuing request");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
