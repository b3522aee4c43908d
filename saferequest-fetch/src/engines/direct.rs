//! Plain async HTTP engine.

use async_trait::async_trait;
use reqwest::header::{self, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy};
use saferequest_core::ResponseEnvelope;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{finish, header_map, http_method};
use crate::engine::{EngineKind, EngineRequest, RequestEngine};
use crate::error::TransportError;

/// Maximum redirects followed per attempt.
pub(crate) const MAX_REDIRECTS: usize = 10;

/// Issues the request over reqwest's async client.
///
/// Response compression is turned off: the client never decodes and the
/// request advertises `Accept-Encoding: identity`, so the body arrives as
/// sent. No size limit is applied to the body. Certificate validation is
/// disabled, as transportation sites routinely serve broken chains.
#[derive(Debug, Clone, Default)]
pub struct DirectAsyncClient;

impl DirectAsyncClient {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }

    /// Builds a client for one attempt, routed through `proxy` if given.
    fn client(proxy: Option<&str>, timeout: Duration) -> Result<Client, TransportError> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .no_zstd()
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

#[async_trait]
impl RequestEngine for DirectAsyncClient {
    fn kind(&self) -> EngineKind {
        EngineKind::DirectAsync
    }

    #[instrument(skip(self, request), fields(url = %request.url, method = %request.method))]
    async fn request(&self, request: &EngineRequest) -> Result<ResponseEnvelope, TransportError> {
        let client = Self::client(request.proxy.as_deref(), request.timeout)?;

        let mut headers = header_map(&request.headers)?;
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let mut builder = client
            .request(http_method(request.method), &request.url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e, request.timeout))?;

        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        debug!(status, "Response received");

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&e, request.timeout))?;

        finish(&request.url, status, &response_headers, body)
    }
}
