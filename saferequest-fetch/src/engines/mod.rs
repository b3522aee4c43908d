//! Request engine implementations.
//!
//! - [`direct`] - reqwest async client, compression off
//! - [`blocking`] - reqwest blocking client on the blocking thread pool
//! - [`scraper`] - async client that waits out anti-bot interstitials
//! - [`browser`] - headless Chromium, plain and stealth

pub mod blocking;
pub mod browser;
pub mod direct;
pub mod scraper;

pub use blocking::ThreadPoolSyncClient;
pub use browser::{HeadlessBrowserClient, StealthHeadlessBrowserClient};
pub use direct::DirectAsyncClient;
pub use scraper::AntiBotScraperClient;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use saferequest_core::{CookieJar, RequestMethod, ResponseEnvelope};
use std::collections::BTreeMap;

use crate::error::TransportError;

/// Converts attempt headers into a reqwest header map.
///
/// Empty values are skipped so an empty jar never sends `Cookie: `.
pub(crate) fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if value.is_empty() {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header {name} value: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Maps the boundary method onto reqwest's.
pub(crate) fn http_method(method: RequestMethod) -> reqwest::Method {
    match method {
        RequestMethod::Get => reqwest::Method::GET,
        RequestMethod::Post => reqwest::Method::POST,
        RequestMethod::Put => reqwest::Method::PUT,
        RequestMethod::Delete => reqwest::Method::DELETE,
    }
}

/// Extracts the token of an `Authorization: Bearer <token>` response header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Collects the cookies a response set.
pub(crate) fn response_cookies(headers: &HeaderMap) -> CookieJar {
    CookieJar::from_set_cookie(
        headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok()),
    )
}

/// Applies the shared failure policy and builds the envelope.
pub(crate) fn finish(
    url: &str,
    status: u16,
    headers: &HeaderMap,
    body: String,
) -> Result<ResponseEnvelope, TransportError> {
    if status > saferequest_core::MAX_SUCCESS_STATUS {
        return Err(TransportError::Status {
            url: url.to_string(),
            status,
            body: Some(body),
        });
    }

    Ok(ResponseEnvelope::new(body, status)
        .with_cookies(response_cookies(headers))
        .with_access_token(bearer_token(headers)))
}
