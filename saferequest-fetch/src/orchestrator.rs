//! Failover orchestrator.
//!
//! [`SafeRequest`] runs one logical request through the configured engine
//! chain. Each chain position is tried at most once per call; the first
//! success wins and its cookies are merged into the session jar. Failures
//! are collected and either raised (first one) or swallowed in favour of a
//! default envelope.

use saferequest_core::{MAX_SUCCESS_STATUS, RequestMethod, ResponseEnvelope};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::RequestConfig;
use crate::engine::{EngineKind, EngineRequest};
use crate::error::{FetchError, TransportError};

/// Default global attempt budget per call.
pub const DEFAULT_MAX_TRIES: usize = 10;

/// Target response bodies are traced under.
const RESPONSE_TARGET: &str = "saferequest::response";

/// Hook run between attempts. It receives the session config and returns
/// the config the next attempt uses.
pub type PostTryHook = Arc<dyn Fn(RequestConfig) -> RequestConfig + Send + Sync>;

/// Errors collected during one call, oldest first.
pub type ErrorLog = Vec<TransportError>;

// ============================================================================
// Fetch Request
// ============================================================================

/// One logical request and its per-call options.
#[derive(Clone)]
pub struct FetchRequest {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: RequestMethod,
    /// Optional JSON body.
    pub body: Option<serde_json::Value>,
    /// Per-attempt timeout; `None` uses the config's default.
    pub timeout: Option<Duration>,
    /// Raise the first error when every attempt failed.
    pub raise_errors: bool,
    /// Global attempt budget shared by the whole chain.
    pub max_tries: usize,
    /// Hooks run before every attempt except the first.
    pub hooks: Vec<PostTryHook>,
    /// Return an envelope built from the last failed response instead of
    /// the default one.
    pub return_last_failure: bool,
}

impl FetchRequest {
    /// Creates a request with the given method.
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            timeout: None,
            raise_errors: false,
            max_tries: DEFAULT_MAX_TRIES,
            hooks: Vec::new(),
            return_last_failure: false,
        }
    }

    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(RequestMethod::Get, url)
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Raises the first error when the whole chain fails.
    #[must_use]
    pub fn raise_errors(mut self, raise: bool) -> Self {
        self.raise_errors = raise;
        self
    }

    /// Sets the global attempt budget.
    #[must_use]
    pub fn max_tries(mut self, max_tries: usize) -> Self {
        self.max_tries = max_tries;
        self
    }

    /// Adds a hook run between attempts.
    #[must_use]
    pub fn hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(RequestConfig) -> RequestConfig + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Returns the last failed response instead of the default envelope.
    #[must_use]
    pub fn return_last_failure(mut self, enabled: bool) -> Self {
        self.return_last_failure = enabled;
        self
    }
}

impl std::fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRequest")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("raise_errors", &self.raise_errors)
            .field("max_tries", &self.max_tries)
            .field("hooks", &self.hooks.len())
            .field("return_last_failure", &self.return_last_failure)
            .finish()
    }
}

// ============================================================================
// Fetch Attempt
// ============================================================================

/// Record of a single engine attempt.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    /// Engine variant.
    pub engine: EngineKind,
    /// Engine name.
    pub name: String,
    /// Proxy the attempt went through.
    pub proxy: Option<String>,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Error if the attempt failed.
    pub error: Option<TransportError>,
    /// How long the attempt took.
    pub duration: Duration,
}

impl FetchAttempt {
    /// Creates a successful attempt record.
    pub fn success(
        engine: EngineKind,
        name: impl Into<String>,
        proxy: Option<String>,
        duration: Duration,
    ) -> Self {
        Self {
            engine,
            name: name.into(),
            proxy,
            success: true,
            error: None,
            duration,
        }
    }

    /// Creates a failed attempt record.
    pub fn failure(
        engine: EngineKind,
        name: impl Into<String>,
        proxy: Option<String>,
        error: TransportError,
        duration: Duration,
    ) -> Self {
        Self {
            engine,
            name: name.into(),
            proxy,
            success: false,
            error: Some(error),
            duration,
        }
    }
}

// ============================================================================
// Fetch Outcome
// ============================================================================

/// The outcome of one execute call.
#[derive(Debug)]
pub struct FetchOutcome {
    /// The returned envelope, or the raised error.
    pub result: Result<ResponseEnvelope, FetchError>,
    /// Errors collected, oldest first.
    pub errors: ErrorLog,
    /// All attempts made.
    pub attempts: Vec<FetchAttempt>,
    /// Attempts counted against the budget.
    pub tries: usize,
    /// Total duration, jitter included.
    pub duration: Duration,
}

impl FetchOutcome {
    /// Returns true if an engine succeeded.
    pub fn is_success(&self) -> bool {
        self.attempts.last().is_some_and(|a| a.success)
    }

    /// Returns the number of engines that were tried.
    pub fn attempts_count(&self) -> usize {
        self.attempts.len()
    }

    /// Returns the engine that succeeded, if any.
    pub fn successful_engine(&self) -> Option<EngineKind> {
        self.attempts.iter().find(|a| a.success).map(|a| a.engine)
    }
}

// ============================================================================
// Safe Request
// ============================================================================

/// A fetch session: one [`RequestConfig`] reused across calls.
///
/// Cookies returned by successful attempts and anything the hooks change
/// persist into the next call.
///
/// ```ignore
/// let mut session = SafeRequest::with_config(
///     RequestConfig::new().user_agent_random(true, false).cookie("lang", "ko"),
/// );
/// let envelope = session
///     .execute(FetchRequest::get("https://bus.example.com/arrivals").raise_errors(true))
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct SafeRequest {
    config: RequestConfig,
}

impl SafeRequest {
    /// Creates a session with the default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session with the given config.
    pub fn with_config(config: RequestConfig) -> Self {
        Self { config }
    }

    /// Current config.
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Applies setters to the config in place.
    pub fn configure<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(RequestConfig) -> RequestConfig,
    {
        self.config = f(std::mem::take(&mut self.config));
        self
    }

    /// Consumes the session, returning its config.
    pub fn into_config(self) -> RequestConfig {
        self.config
    }

    /// Runs the request through the chain and returns the envelope.
    pub async fn execute(&mut self, request: FetchRequest) -> Result<ResponseEnvelope, FetchError> {
        self.execute_detailed(request).await.result
    }

    /// Runs the request through the chain, returning every attempt.
    #[instrument(skip(self, request), fields(url = %request.url, method = %request.method))]
    pub async fn execute_detailed(&mut self, request: FetchRequest) -> FetchOutcome {
        let start = Instant::now();
        let chain = self.config.engines().to_vec();
        let mut tries = 0;
        let mut errors = ErrorLog::new();
        let mut attempts = Vec::new();

        info!(engines = chain.len(), max_tries = request.max_tries, "Executing fetch");

        for engine in &chain {
            let pause = self.config.jitter_delay();
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }

            // The budget is shared by the whole chain. Running out of it
            // ends the fetch without raising.
            if tries >= request.max_tries {
                debug!(tries, "Attempt budget exhausted");
                return FetchOutcome {
                    result: Ok(ResponseEnvelope::default()),
                    errors,
                    attempts,
                    tries,
                    duration: start.elapsed(),
                };
            }

            if tries > 0 {
                for hook in &request.hooks {
                    self.config = hook(std::mem::take(&mut self.config));
                }
            }

            let proxy = self.config.proxy_pool().choose().map(str::to_string);
            let engine_request = EngineRequest {
                headers: self.config.attempt_headers(),
                method: request.method,
                url: request.url.clone(),
                body: request.body.clone(),
                proxy: proxy.clone(),
                timeout: request
                    .timeout
                    .unwrap_or_else(|| self.config.default_timeout()),
            };

            debug!(
                engine = engine.name(),
                proxy = proxy.as_deref().unwrap_or("none"),
                "Attempting request"
            );

            let attempt_start = Instant::now();
            let result = engine.request(&engine_request).await;
            let duration = attempt_start.elapsed();
            tries += 1;

            match result {
                Ok(envelope) => {
                    if envelope.status_code() <= MAX_SUCCESS_STATUS {
                        self.config.merge_cookies(envelope.cookies());
                    }
                    trace_body(&request.url, &envelope);
                    info!(
                        engine = engine.name(),
                        status = envelope.status_code(),
                        duration = ?duration,
                        "Request succeeded"
                    );

                    attempts.push(FetchAttempt::success(
                        engine.kind(),
                        engine.name(),
                        proxy,
                        duration,
                    ));
                    return FetchOutcome {
                        result: Ok(envelope),
                        errors,
                        attempts,
                        tries,
                        duration: start.elapsed(),
                    };
                }
                Err(error) => {
                    warn!(
                        engine = engine.name(),
                        error = %error,
                        duration = ?duration,
                        "Engine failed"
                    );
                    attempts.push(FetchAttempt::failure(
                        engine.kind(),
                        engine.name(),
                        proxy,
                        error.clone(),
                        duration,
                    ));
                    errors.push(error);
                }
            }
        }

        let result = match errors.first() {
            Some(first) if request.raise_errors => {
                warn!(failures = errors.len(), "All engines failed");
                Err(FetchError::AllEnginesFailed {
                    first: first.clone(),
                    failures: errors.len(),
                })
            }
            _ if request.return_last_failure => Ok(errors
                .last()
                .and_then(failure_envelope)
                .unwrap_or_default()),
            _ => Ok(ResponseEnvelope::default()),
        };

        FetchOutcome {
            result,
            errors,
            attempts,
            tries,
            duration: start.elapsed(),
        }
    }
}

/// Envelope for a failure that carried an HTTP response.
fn failure_envelope(error: &TransportError) -> Option<ResponseEnvelope> {
    match error {
        TransportError::Status { status, body, .. } => Some(match body {
            Some(body) => ResponseEnvelope::new(body.clone(), *status),
            None => ResponseEnvelope::without_body(*status),
        }),
        _ => None,
    }
}

/// Traces a response body, tagged with its host.
fn trace_body(url: &str, envelope: &ResponseEnvelope) {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    trace!(
        target: RESPONSE_TARGET,
        host = %host,
        status = envelope.status_code(),
        body = envelope.body().unwrap_or_default(),
        "Response body"
    );
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RequestEngine;
    use async_trait::async_trait;
    use saferequest_core::CookieJar;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine that always returns the same outcome and records what it saw.
    struct StubEngine {
        outcome: Result<ResponseEnvelope, TransportError>,
        seen: Mutex<Vec<EngineRequest>>,
    }

    impl StubEngine {
        fn ok(envelope: ResponseEnvelope) -> Arc<Self> {
            Arc::new(Self {
                outcome: Ok(envelope),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(error: TransportError) -> Arc<Self> {
            Arc::new(Self {
                outcome: Err(error),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn last_request(&self) -> EngineRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl RequestEngine for StubEngine {
        fn kind(&self) -> EngineKind {
            EngineKind::DirectAsync
        }

        async fn request(&self, request: &EngineRequest) -> Result<ResponseEnvelope, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            self.outcome.clone()
        }
    }

    fn status_error(status: u16) -> TransportError {
        TransportError::Status {
            url: "https://bus.example.com".to_string(),
            status,
            body: Some(format!("status {status}")),
        }
    }

    fn session(chain: Vec<Arc<dyn RequestEngine>>) -> SafeRequest {
        SafeRequest::with_config(
            RequestConfig::new()
                .jitter(Duration::ZERO, Duration::ZERO)
                .chain(chain),
        )
    }

    const URL: &str = "https://bus.example.com/arrivals";

    #[tokio::test]
    async fn test_success_returns_envelope_and_grows_jar() {
        let engine = StubEngine::ok(
            ResponseEnvelope::new("{\"buses\":[]}", 200).with_cookies(CookieJar::parse("sid=abc")),
        );
        let mut request = session(vec![engine.clone()]);
        request.configure(|c| c.cookie("lang", "ko"));
        let before = request.config().cookie_jar().clone();

        let envelope = request.execute(FetchRequest::get(URL)).await.unwrap();

        assert_eq!(envelope.status_code(), 200);
        assert!(envelope.has_succeeded());
        let after = request.config().cookie_jar();
        assert!(after.is_superset_of(&before));
        assert_eq!(after.get("sid"), Some("abc"));
        assert_eq!(engine.last_request().header("cookie"), Some("lang=ko"));
    }

    #[tokio::test]
    async fn test_all_failing_raises_first_error() {
        let chain: Vec<Arc<dyn RequestEngine>> = vec![
            StubEngine::failing(status_error(403)),
            StubEngine::failing(TransportError::Network("reset".into())),
            StubEngine::failing(status_error(503)),
        ];
        let mut request = session(chain);

        let err = request
            .execute(FetchRequest::get(URL).raise_errors(true))
            .await
            .unwrap_err();

        match err {
            FetchError::AllEnginesFailed { first, failures } => {
                assert_eq!(first, status_error(403));
                assert_eq!(failures, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_tries_never_exceed_budget() {
        let engines: Vec<Arc<StubEngine>> = (0..5)
            .map(|_| StubEngine::failing(status_error(500)))
            .collect();
        let chain: Vec<Arc<dyn RequestEngine>> = engines
            .iter()
            .map(|e| e.clone() as Arc<dyn RequestEngine>)
            .collect();
        let mut request = session(chain);

        let outcome = request
            .execute_detailed(FetchRequest::get(URL).max_tries(2))
            .await;

        assert_eq!(outcome.tries, 2);
        assert_eq!(outcome.attempts_count(), 2);
        assert_eq!(engines[0].calls() + engines[1].calls(), 2);
        assert!(engines[2..].iter().all(|e| e.calls() == 0));
    }

    #[tokio::test]
    async fn test_failover_to_second_engine() {
        let first = StubEngine::failing(status_error(403));
        let second = StubEngine::ok(
            ResponseEnvelope::new("ok", 200).with_cookies(CookieJar::parse("sid=abc")),
        );
        let mut request = session(vec![first, second]);

        let outcome = request
            .execute_detailed(FetchRequest::get(URL).max_tries(5))
            .await;

        let envelope = outcome.result.as_ref().unwrap();
        assert_eq!(envelope.status_code(), 200);
        assert_eq!(request.config().cookie_jar().get("sid"), Some("abc"));
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.tries, 2);
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_single_budget_returns_default_or_raises() {
        let chain: Vec<Arc<dyn RequestEngine>> = vec![
            StubEngine::failing(status_error(403)),
            StubEngine::ok(ResponseEnvelope::new("ok", 200)),
        ];
        let mut request = session(chain);

        let envelope = request
            .execute(FetchRequest::get(URL).max_tries(1))
            .await
            .unwrap();
        assert_eq!(envelope, ResponseEnvelope::default());
        assert_eq!(envelope.status_code(), 400);
        assert!(!envelope.has_succeeded());

        // A single-engine chain is exhausted before the budget, so it raises.
        let mut single = session(vec![StubEngine::failing(status_error(403))]);
        let err = single
            .execute(FetchRequest::get(URL).max_tries(1).raise_errors(true))
            .await
            .unwrap_err();
        assert_eq!(err.first_transport_error(), Some(&status_error(403)));
    }

    #[tokio::test]
    async fn test_budget_stop_never_raises() {
        let second = StubEngine::ok(ResponseEnvelope::new("ok", 200));
        let chain: Vec<Arc<dyn RequestEngine>> =
            vec![StubEngine::failing(status_error(403)), second.clone()];
        let mut request = session(chain);

        let outcome = request
            .execute_detailed(FetchRequest::get(URL).max_tries(1).raise_errors(true))
            .await;

        assert_eq!(outcome.result.unwrap(), ResponseEnvelope::default());
        assert_eq!(outcome.tries, 1);
        assert_eq!(outcome.errors, vec![status_error(403)]);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_hooks_run_only_after_first_attempt() {
        let counter = Arc::new(AtomicUsize::new(0));
        let third = StubEngine::ok(ResponseEnvelope::new("ok", 200));
        let chain: Vec<Arc<dyn RequestEngine>> = vec![
            StubEngine::failing(status_error(500)),
            StubEngine::failing(status_error(502)),
            third.clone(),
        ];
        let mut request = session(chain);

        let hook_counter = Arc::clone(&counter);
        let fetch = FetchRequest::get(URL).hook(move |config| {
            let n = hook_counter.fetch_add(1, Ordering::SeqCst) + 1;
            config.header("X-Retry", n.to_string())
        });

        request.execute(fetch).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(third.last_request().header("x-retry"), Some("2"));
    }

    #[tokio::test]
    async fn test_no_hooks_for_single_success() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut request = session(vec![StubEngine::ok(ResponseEnvelope::new("ok", 200))]);
        let hook_counter = Arc::clone(&counter);
        request
            .execute(FetchRequest::get(URL).hook(move |config| {
                hook_counter.fetch_add(1, Ordering::SeqCst);
                config
            }))
            .await
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_return_last_failure() {
        let chain: Vec<Arc<dyn RequestEngine>> = vec![
            StubEngine::failing(status_error(403)),
            StubEngine::failing(status_error(503)),
        ];
        let mut request = session(chain);

        let envelope = request
            .execute(FetchRequest::get(URL).return_last_failure(true))
            .await
            .unwrap();
        assert_eq!(envelope.status_code(), 503);
        assert_eq!(envelope.body(), Some("status 503"));
        assert!(!envelope.has_succeeded());

        let mut request = session(vec![StubEngine::failing(TransportError::Network(
            "refused".into(),
        ))]);
        let envelope = request
            .execute(FetchRequest::get(URL).return_last_failure(true))
            .await
            .unwrap();
        assert_eq!(envelope, ResponseEnvelope::default());
    }

    #[tokio::test]
    async fn test_request_options_reach_engine() {
        let engine = StubEngine::ok(ResponseEnvelope::new("ok", 200));
        let mut request = session(vec![engine.clone()]);
        request.configure(|c| c.proxies(["http://10.0.0.1:3128"]).timeout(Duration::from_secs(7)));

        request
            .execute(
                FetchRequest::new(RequestMethod::Post, URL).body(serde_json::json!({"stop": 42})),
            )
            .await
            .unwrap();

        let seen = engine.last_request();
        assert_eq!(seen.method, RequestMethod::Post);
        assert_eq!(seen.body, Some(serde_json::json!({"stop": 42})));
        assert_eq!(seen.timeout, Duration::from_secs(7));
        assert!(seen.proxy.is_none() || seen.proxy.as_deref() == Some("http://10.0.0.1:3128"));

        request
            .execute(FetchRequest::get(URL).timeout(Duration::from_secs(3)))
            .await
            .unwrap();
        assert_eq!(engine.last_request().timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_cookies_persist_across_calls() {
        let first = StubEngine::ok(
            ResponseEnvelope::new("ok", 200).with_cookies(CookieJar::parse("sid=abc")),
        );
        let mut request = session(vec![first.clone()]);

        request.execute(FetchRequest::get(URL)).await.unwrap();
        request.execute(FetchRequest::get(URL)).await.unwrap();

        assert_eq!(first.last_request().header("cookie"), Some("sid=abc"));
    }

    #[tokio::test]
    async fn test_error_status_envelope_leaves_jar_alone() {
        let engine = StubEngine::ok(
            ResponseEnvelope::new("oops", 500).with_cookies(CookieJar::parse("sid=stale")),
        );
        let mut request = session(vec![engine]);

        let envelope = request.execute(FetchRequest::get(URL)).await.unwrap();

        assert_eq!(envelope.status_code(), 500);
        assert!(request.config().cookie_jar().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chain_and_zero_budget() {
        let mut request = session(Vec::new());
        let outcome = request.execute_detailed(FetchRequest::get(URL)).await;
        assert_eq!(outcome.tries, 0);
        assert_eq!(outcome.result.unwrap(), ResponseEnvelope::default());

        let engine = StubEngine::ok(ResponseEnvelope::new("ok", 200));
        let mut request = session(vec![engine.clone()]);
        let outcome = request
            .execute_detailed(FetchRequest::get(URL).max_tries(0).raise_errors(true))
            .await;
        assert_eq!(engine.calls(), 0);
        assert!(outcome.errors.is_empty());
        assert!(outcome.result.is_ok());
    }
}
