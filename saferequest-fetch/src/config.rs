//! Request configuration carried across attempts and calls.
//!
//! [`RequestConfig`] is the state a [`SafeRequest`](crate::SafeRequest)
//! session owns: headers, cookies, proxies, the engine chain, the default
//! timeout and the pre-attempt jitter. Every setter consumes and returns
//! the config so calls chain.

use rand::Rng;
use saferequest_core::{CookieJar, ProxyPool};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{EngineKind, RequestEngine};
use crate::settings::FetchSettings;
use crate::user_agent::{
    self, DEFAULT_USER_AGENT, MOBILE_CLIENT_HINTS, Platform, UserAgentGenerator,
};

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default lower jitter bound.
pub const DEFAULT_JITTER_MIN: Duration = Duration::from_millis(1000);

/// Default upper jitter bound.
pub const DEFAULT_JITTER_MAX: Duration = Duration::from_millis(2000);

const ACCEPT_ANY: &str = "text/html,application/json,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Header set every new config starts with.
const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("Accept", ACCEPT_ANY),
    (
        "Accept-Language",
        "en-US,en;q=0.9,ko;q=0.8,ja;q=0.7,zh-CN;q=0.6,zh;q=0.5",
    ),
    ("Accept-Encoding", "gzip, deflate, br, zstd"),
    ("User-Agent", DEFAULT_USER_AGENT),
    ("Cache-Control", "max-age=0"),
    ("Content-Type", "application/json"),
    ("Connection", "close"),
    ("Sec-Fetch-Dest", "document"),
    ("Priority", "u=0, i"),
];

// ============================================================================
// Request Config
// ============================================================================

/// Session state for a [`SafeRequest`](crate::SafeRequest).
#[derive(Clone)]
pub struct RequestConfig {
    headers: BTreeMap<String, String>,
    cookies: CookieJar,
    proxies: ProxyPool,
    chain: Vec<Arc<dyn RequestEngine>>,
    timeout: Duration,
    jitter_min: Duration,
    jitter_max: Duration,
}

impl RequestConfig {
    /// Creates a config with browser-like headers and the default chain.
    pub fn new() -> Self {
        Self {
            headers: DEFAULT_HEADERS
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                .collect(),
            cookies: CookieJar::new(),
            proxies: ProxyPool::new(),
            chain: EngineKind::build_chain(EngineKind::default_chain()),
            timeout: DEFAULT_TIMEOUT,
            jitter_min: DEFAULT_JITTER_MIN,
            jitter_max: DEFAULT_JITTER_MAX,
        }
    }

    /// Creates a config from a settings file.
    pub fn from_settings(settings: &FetchSettings) -> Self {
        let (min, max) = settings.jitter();
        let mut config = Self::new()
            .chain_kinds(&settings.chain)
            .proxies(settings.proxies.iter().cloned())
            .headers(settings.headers.clone())
            .timeout(settings.timeout())
            .jitter(min, max);
        if let Some(agent) = &settings.user_agent {
            config = config.user_agent(agent);
        }
        config
    }

    // ------------------------------------------------------------------------
    // Headers
    // ------------------------------------------------------------------------

    /// Sets `Accept`.
    #[must_use]
    pub fn accept(self, value: impl Into<String>) -> Self {
        self.header("Accept", value)
    }

    /// Restores the default browser `Accept` value.
    #[must_use]
    pub fn accept_text_html(self) -> Self {
        self.header("Accept", ACCEPT_ANY)
    }

    /// Sets `Accept-Language`.
    #[must_use]
    pub fn accept_language(self, value: impl Into<String>) -> Self {
        self.header("Accept-Language", value)
    }

    /// Sets `Accept-Language` to a randomly drawn candidate.
    #[must_use]
    pub fn accept_language_random(self) -> Self {
        self.header("Accept-Language", user_agent::random_accept_language())
    }

    /// Sets `Accept-Encoding`.
    #[must_use]
    pub fn accept_encoding(self, value: impl Into<String>) -> Self {
        self.header("Accept-Encoding", value)
    }

    /// Sets `User-Agent`.
    #[must_use]
    pub fn user_agent(self, value: impl Into<String>) -> Self {
        self.header("User-Agent", value)
    }

    /// Sets a random `User-Agent` for the selected platforms.
    ///
    /// Selecting neither platform draws from both. A mobile agent also gets
    /// the mobile client hints; a desktop agent has them removed.
    #[must_use]
    pub fn user_agent_random(self, mobile: bool, pc: bool) -> Self {
        let mut platforms = Vec::with_capacity(2);
        if mobile {
            platforms.push(Platform::Mobile);
        }
        if pc {
            platforms.push(Platform::Pc);
        }

        let agent = UserAgentGenerator::new(&platforms).random();
        let mut config = self.user_agent(agent);
        for &(name, value) in MOBILE_CLIENT_HINTS {
            if user_agent::is_mobile(agent) {
                config.set_header(name, value);
            } else {
                config.remove_header(name);
            }
        }
        config
    }

    /// Sets or clears `Authorization: Bearer <token>`.
    #[must_use]
    pub fn auth(mut self, token: Option<&str>) -> Self {
        match token {
            Some(token) => self.set_header("Authorization", format!("Bearer {token}")),
            None => self.remove_header("Authorization"),
        }
        self
    }

    /// Sets `Connection`.
    #[must_use]
    pub fn connection(self, value: impl Into<String>) -> Self {
        self.header("Connection", value)
    }

    /// Sets `Connection: keep-alive`.
    #[must_use]
    pub fn keep_alive(self) -> Self {
        self.connection("keep-alive")
    }

    /// Sets `Cache-Control`.
    #[must_use]
    pub fn cache_control(self, value: impl Into<String>) -> Self {
        self.header("Cache-Control", value)
    }

    /// Sets one header, replacing any existing header of the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets several headers.
    #[must_use]
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.set_header(name, value);
        }
        self
    }

    /// Header names compare case-insensitively.
    fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove_header(&name);
        self.headers.insert(name, value.into());
    }

    fn remove_header(&mut self, name: &str) {
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
    }

    // ------------------------------------------------------------------------
    // Chain and Timing
    // ------------------------------------------------------------------------

    /// Replaces the engine chain.
    #[must_use]
    pub fn chain(mut self, chain: Vec<Arc<dyn RequestEngine>>) -> Self {
        self.chain = chain;
        self
    }

    /// Replaces the engine chain with freshly built engines of `kinds`.
    #[must_use]
    pub fn chain_kinds(self, kinds: &[EngineKind]) -> Self {
        self.chain(EngineKind::build_chain(kinds))
    }

    /// Sets the default per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the range the pre-attempt pause is drawn from.
    #[must_use]
    pub fn jitter(mut self, min: Duration, max: Duration) -> Self {
        self.jitter_min = min.min(max);
        self.jitter_max = min.max(max);
        self
    }

    // ------------------------------------------------------------------------
    // Proxies
    // ------------------------------------------------------------------------

    /// Appends one proxy, or clears the pool with `None`.
    #[must_use]
    pub fn proxy(mut self, proxy: Option<&str>) -> Self {
        match proxy {
            Some(proxy) => self.proxies.push(proxy),
            None => self.proxies.clear(),
        }
        self
    }

    /// Replaces the proxy pool.
    #[must_use]
    pub fn proxies<I, S>(mut self, proxies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.proxies = ProxyPool::from_list(proxies);
        self
    }

    /// Replaces the proxy pool from a comma-separated list.
    #[must_use]
    pub fn proxies_csv(mut self, csv: &str) -> Self {
        self.proxies = ProxyPool::from_csv(csv);
        self
    }

    /// Empties the proxy pool.
    #[must_use]
    pub fn no_proxies(mut self) -> Self {
        self.proxies.clear();
        self
    }

    // ------------------------------------------------------------------------
    // Cookies
    // ------------------------------------------------------------------------

    /// Sets one cookie.
    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name, value);
        self
    }

    /// Merges a raw `k=v; k2=v2` cookie string.
    #[must_use]
    pub fn cookie_str(mut self, raw: &str) -> Self {
        self.cookies.merge_str(raw);
        self
    }

    /// Merges several cookies.
    #[must_use]
    pub fn cookies<K, V>(mut self, cookies: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.cookies.extend(cookies);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Configured headers, without `Cookie`.
    pub fn header_map(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Looks a configured header up case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Current cookie jar.
    pub fn cookie_jar(&self) -> &CookieJar {
        &self.cookies
    }

    /// Merges cookies an engine returned.
    pub fn merge_cookies(&mut self, cookies: &CookieJar) {
        self.cookies.merge(cookies);
    }

    /// Current proxy pool.
    pub fn proxy_pool(&self) -> &ProxyPool {
        &self.proxies
    }

    /// Current engine chain.
    pub fn engines(&self) -> &[Arc<dyn RequestEngine>] {
        &self.chain
    }

    /// Default per-attempt timeout.
    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    /// Jitter bounds.
    pub fn jitter_range(&self) -> (Duration, Duration) {
        (self.jitter_min, self.jitter_max)
    }

    /// Draws one pre-attempt pause.
    pub fn jitter_delay(&self) -> Duration {
        if self.jitter_max <= self.jitter_min {
            return self.jitter_min;
        }
        let min = u64::try_from(self.jitter_min.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.jitter_max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Headers for one attempt: configured headers plus the rendered jar.
    pub fn attempt_headers(&self) -> BTreeMap<String, String> {
        let mut headers = self.headers.clone();
        headers.retain(|key, _| !key.eq_ignore_ascii_case("cookie"));
        headers.insert("Cookie".to_string(), self.cookies.to_header());
        headers
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestConfig")
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("proxies", &self.proxies)
            .field(
                "chain",
                &self.chain.iter().map(|e| e.kind()).collect::<Vec<_>>(),
            )
            .field("timeout", &self.timeout)
            .field("jitter", &(self.jitter_min, self.jitter_max))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
