//! Request engine trait and types.
//!
//! An engine is one transport strategy for issuing an HTTP request: a
//! plain async client, a blocking client on the thread pool, an anti-bot
//! scraper, or a headless browser. The orchestrator tries engines in chain
//! order against the same logical request.

use async_trait::async_trait;
use saferequest_core::{CoreError, RequestMethod, ResponseEnvelope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::engines::{
    AntiBotScraperClient, DirectAsyncClient, HeadlessBrowserClient, StealthHeadlessBrowserClient,
    ThreadPoolSyncClient,
};
use crate::error::TransportError;

// ============================================================================
// Engine Kind
// ============================================================================

/// The closed set of engine variants.
///
/// This is the serializable tag used to describe a chain as data (settings
/// file, CLI flag); [`EngineKind::build`] turns it into an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Standard async HTTP client.
    DirectAsync,
    /// Blocking HTTP client run on the blocking thread pool.
    ThreadPoolSync,
    /// Scraping client that waits out anti-bot interstitials.
    AntiBotScraper,
    /// Managed headless Chromium.
    HeadlessBrowser,
    /// Headless Chromium with automation-detection evasion.
    StealthHeadlessBrowser,
}

impl EngineKind {
    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DirectAsync => "Direct Async",
            Self::ThreadPoolSync => "Thread Pool Sync",
            Self::AntiBotScraper => "Anti-Bot Scraper",
            Self::HeadlessBrowser => "Headless Browser",
            Self::StealthHeadlessBrowser => "Stealth Headless Browser",
        }
    }

    /// Snake-case identifier, as used in settings files.
    pub fn id(&self) -> &'static str {
        match self {
            Self::DirectAsync => "direct_async",
            Self::ThreadPoolSync => "thread_pool_sync",
            Self::AntiBotScraper => "anti_bot_scraper",
            Self::HeadlessBrowser => "headless_browser",
            Self::StealthHeadlessBrowser => "stealth_headless_browser",
        }
    }

    /// Whether this engine drives a real browser.
    pub fn is_browser(&self) -> bool {
        matches!(self, Self::HeadlessBrowser | Self::StealthHeadlessBrowser)
    }

    /// Returns all engine variants.
    pub fn all() -> &'static [EngineKind] {
        &[
            Self::DirectAsync,
            Self::ThreadPoolSync,
            Self::AntiBotScraper,
            Self::HeadlessBrowser,
            Self::StealthHeadlessBrowser,
        ]
    }

    /// Chain used when none is configured. Browsers are opt-in.
    pub fn default_chain() -> &'static [EngineKind] {
        &[Self::AntiBotScraper, Self::DirectAsync, Self::ThreadPoolSync]
    }

    /// Creates the engine for this kind.
    pub fn build(self) -> Arc<dyn RequestEngine> {
        match self {
            Self::DirectAsync => Arc::new(DirectAsyncClient::new()),
            Self::ThreadPoolSync => Arc::new(ThreadPoolSyncClient::new()),
            Self::AntiBotScraper => Arc::new(AntiBotScraperClient::new()),
            Self::HeadlessBrowser => Arc::new(HeadlessBrowserClient::new()),
            Self::StealthHeadlessBrowser => Arc::new(StealthHeadlessBrowserClient::new()),
        }
    }

    /// Builds a chain from a list of kinds.
    pub fn build_chain(kinds: &[EngineKind]) -> Vec<Arc<dyn RequestEngine>> {
        kinds.iter().map(|kind| kind.build()).collect()
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for EngineKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "direct_async" | "direct" | "async" => Ok(Self::DirectAsync),
            "thread_pool_sync" | "blocking" | "sync" => Ok(Self::ThreadPoolSync),
            "anti_bot_scraper" | "scraper" => Ok(Self::AntiBotScraper),
            "headless_browser" | "browser" => Ok(Self::HeadlessBrowser),
            "stealth_headless_browser" | "stealth" => Ok(Self::StealthHeadlessBrowser),
            _ => Err(CoreError::InvalidEngine(s.to_string())),
        }
    }
}

// ============================================================================
// Engine Request
// ============================================================================

/// Everything one engine needs for one attempt.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    /// Headers for this attempt, including the rendered `Cookie` header.
    pub headers: BTreeMap<String, String>,
    /// HTTP method.
    pub method: RequestMethod,
    /// Target URL.
    pub url: String,
    /// Optional JSON body.
    pub body: Option<serde_json::Value>,
    /// Egress proxy for this attempt; `None` uses the default route.
    pub proxy: Option<String>,
    /// Upper bound for this attempt.
    pub timeout: Duration,
}

impl EngineRequest {
    /// Creates a GET request with no headers, no proxy and a 60 second timeout.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            headers: BTreeMap::new(),
            method: RequestMethod::Get,
            url: url.into(),
            body: None,
            proxy: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Looks a header up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

// ============================================================================
// Request Engine Trait
// ============================================================================

/// One transport strategy for issuing an HTTP request.
///
/// Implementations return an envelope on success and a [`TransportError`]
/// when the call raised a network error or the final status was above 399.
///
/// ## Implementing an Engine
///
/// ```ignore
/// struct FixtureEngine;
///
/// #[async_trait]
/// impl RequestEngine for FixtureEngine {
///     fn kind(&self) -> EngineKind {
///         EngineKind::DirectAsync
///     }
///
///     async fn request(&self, request: &EngineRequest) -> Result<ResponseEnvelope, TransportError> {
///         Ok(ResponseEnvelope::new("<html></html>", 200))
///     }
/// }
/// ```
#[async_trait]
pub trait RequestEngine: Send + Sync {
    /// Which variant this engine is.
    fn kind(&self) -> EngineKind;

    /// Name used in logs and attempt records.
    fn name(&self) -> &str {
        self.kind().display_name()
    }

    /// Executes one attempt.
    async fn request(&self, request: &EngineRequest) -> Result<ResponseEnvelope, TransportError>;
}

// ============================================================================
// Tests
// ============================================================================
