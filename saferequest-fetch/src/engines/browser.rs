//! Headless browser engines.
//!
//! Both engines launch a private headless Chromium per attempt, navigate to
//! the URL and read back the rendered page source and every session cookie.
//! Navigation has no status-code semantics, so a page that loaded is always
//! reported as status 200 without an access token.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use futures::StreamExt;
use saferequest_core::{CookieJar, RequestMethod, ResponseEnvelope};
use tracing::{debug, instrument, warn};

use crate::engine::{EngineKind, EngineRequest, RequestEngine};
use crate::error::TransportError;

/// Browser window width.
const WINDOW_WIDTH: u32 = 1420;

/// Browser window height.
const WINDOW_HEIGHT: u32 = 1080;

/// Status reported for every page that loaded.
const NAVIGATION_STATUS: u16 = 200;

// ============================================================================
// Launch
// ============================================================================

/// How the browser presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Profile {
    Standard,
    Stealth,
}

/// Extra Chromium flags for one launch.
fn launch_args(proxy: Option<&str>, profile: Profile) -> Vec<String> {
    let mut args = vec!["--disable-gpu".to_string()];
    if let Some(proxy) = proxy {
        args.push(format!("--proxy-server={proxy}"));
    }
    if profile == Profile::Stealth {
        args.push("--disable-blink-features=AutomationControlled".to_string());
        args.push("--disable-infobars".to_string());
    }
    args
}

/// Cookies from the attempt's `Cookie` header, scoped to the target URL.
fn session_cookies(request: &EngineRequest) -> Vec<CookieParam> {
    let Some(raw) = request.header("cookie") else {
        return Vec::new();
    };
    CookieJar::parse(raw)
        .iter()
        .map(|(name, value)| {
            let mut param = CookieParam::new(name, value);
            param.url = Some(request.url.clone());
            param
        })
        .collect()
}

/// Launches Chromium, runs the navigation, and always shuts the browser down.
async fn browse(request: &EngineRequest, profile: Profile) -> Result<ResponseEnvelope, TransportError> {
    if request.method != RequestMethod::Get || request.body.is_some() {
        debug!(method = %request.method, "Browser navigation ignores method and body");
    }

    let config = BrowserConfig::builder()
        .no_sandbox()
        .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
        .request_timeout(request.timeout)
        .args(launch_args(request.proxy.as_deref(), profile))
        .build()
        .map_err(TransportError::Browser)?;

    let (mut browser, mut handler) = Browser::launch(config).await?;
    let events = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    let outcome = tokio::time::timeout(request.timeout, navigate(&browser, request, profile))
        .await
        .unwrap_or(Err(TransportError::Timeout(request.timeout)));

    if let Err(e) = browser.close().await {
        warn!(error = %e, "Failed to close browser");
    }
    if let Err(e) = browser.wait().await {
        debug!(error = %e, "Browser process did not exit cleanly");
    }
    events.abort();

    outcome
}

/// User-Agent override for a plain page, carrying the request's language.
fn user_agent_override(agent: &str, request: &EngineRequest) -> SetUserAgentOverrideParams {
    let mut params = SetUserAgentOverrideParams::new(agent);
    params.accept_language = request.header("accept-language").map(str::to_string);
    params
}

/// Loads the page and reads back its source and cookies.
async fn navigate(
    browser: &Browser,
    request: &EngineRequest,
    profile: Profile,
) -> Result<ResponseEnvelope, TransportError> {
    let page = browser.new_page("about:blank").await?;
    let user_agent = request.header("user-agent");

    match (profile, user_agent) {
        (Profile::Stealth, Some(agent)) => page.enable_stealth_mode_with_agent(agent).await?,
        (Profile::Stealth, None) => page.enable_stealth_mode().await?,
        (Profile::Standard, Some(agent)) => {
            page.set_user_agent(user_agent_override(agent, request))
                .await?;
        }
        (Profile::Standard, None) => {}
    }

    let cookies = session_cookies(request);
    if !cookies.is_empty() {
        page.set_cookies(cookies).await?;
    }

    page.goto(request.url.as_str()).await?;
    let content = page.content().await?;
    let jar: CookieJar = page
        .get_cookies()
        .await?
        .into_iter()
        .map(|cookie| (cookie.name, cookie.value))
        .collect();

    debug!(cookies = jar.len(), bytes = content.len(), "Page rendered");
    Ok(ResponseEnvelope::new(content, NAVIGATION_STATUS).with_cookies(jar))
}

// ============================================================================
// Engines
// ============================================================================

/// Managed headless Chromium.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBrowserClient;

impl HeadlessBrowserClient {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RequestEngine for HeadlessBrowserClient {
    fn kind(&self) -> EngineKind {
        EngineKind::HeadlessBrowser
    }

    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn request(&self, request: &EngineRequest) -> Result<ResponseEnvelope, TransportError> {
        browse(request, Profile::Standard).await
    }
}

/// Headless Chromium that hides automation markers (`navigator.webdriver`,
/// the automation blink feature, headless user-agent tokens).
#[derive(Debug, Clone, Default)]
pub struct StealthHeadlessBrowserClient;

impl StealthHeadlessBrowserClient {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RequestEngine for StealthHeadlessBrowserClient {
    fn kind(&self) -> EngineKind {
        EngineKind::StealthHeadlessBrowser
    }

    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn request(&self, request: &EngineRequest) -> Result<ResponseEnvelope, TransportError> {
        browse(request, Profile::Stealth).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args_standard() {
        let args = launch_args(None, Profile::Standard);
        assert_eq!(args, vec!["--disable-gpu"]);
    }

    #[test]
    fn test_launch_args_stealth_with_proxy() {
        let args = launch_args(Some("http://10.0.0.1:3128"), Profile::Stealth);
        assert!(args.contains(&"--proxy-server=http://10.0.0.1:3128".to_string()));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
    }

    #[test]
    fn test_user_agent_override_carries_language() {
        let mut request = EngineRequest::get("https://bus.example.com/arrivals");
        request
            .headers
            .insert("Accept-Language".to_string(), "ko-KR,ko;q=0.9".to_string());

        let params = user_agent_override("Mozilla/5.0 (X11; Linux x86_64)", &request);
        assert_eq!(params.user_agent, "Mozilla/5.0 (X11; Linux x86_64)");
        assert_eq!(params.accept_language.as_deref(), Some("ko-KR,ko;q=0.9"));

        let bare = user_agent_override("agent", &EngineRequest::get("https://x"));
        assert!(bare.accept_language.is_none());
    }

    #[test]
    fn test_session_cookies_scoped_to_url() {
        let mut request = EngineRequest::get("https://bus.example.com/arrivals");
        request
            .headers
            .insert("Cookie".to_string(), "sid=abc; lang=ko".to_string());

        let cookies = session_cookies(&request);
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.url.as_deref() == Some("https://bus.example.com/arrivals")));
        assert!(session_cookies(&EngineRequest::get("https://x")).is_empty());
    }
}
