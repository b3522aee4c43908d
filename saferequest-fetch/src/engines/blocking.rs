//! Blocking HTTP engine run on the blocking thread pool.

use async_trait::async_trait;
use reqwest::Proxy;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use saferequest_core::ResponseEnvelope;
use tracing::{debug, instrument};

use super::direct::MAX_REDIRECTS;
use super::{finish, header_map, http_method};
use crate::engine::{EngineKind, EngineRequest, RequestEngine};
use crate::error::TransportError;

/// Issues the request with reqwest's blocking client inside
/// [`tokio::task::spawn_blocking`].
///
/// The calling task is suspended until the worker thread finishes, so the
/// async scheduler keeps serving other fetches meanwhile. Responses are
/// decompressed transparently.
#[derive(Debug, Clone, Default)]
pub struct ThreadPoolSyncClient;

impl ThreadPoolSyncClient {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }

    /// Runs one attempt to completion on the current (blocking) thread.
    ///
    /// The client is created and dropped here, never on an async worker.
    fn execute(request: &EngineRequest) -> Result<ResponseEnvelope, TransportError> {
        let mut builder = Client::builder()
            .timeout(request.timeout)
            .danger_accept_invalid_certs(true)
            .redirect(Policy::limited(MAX_REDIRECTS));

        if let Some(proxy) = request.proxy.as_deref() {
            let proxy = Proxy::all(proxy)
                .map_err(|e| TransportError::InvalidRequest(format!("proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::from_reqwest(&e, request.timeout))?;

        let mut call = client
            .request(http_method(request.method), &request.url)
            .headers(header_map(&request.headers)?);
        if let Some(body) = &request.body {
            call = call.json(body);
        }

        let response = call
            .send()
            .map_err(|e| TransportError::from_reqwest(&e, request.timeout))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .map_err(|e| TransportError::from_reqwest(&e, request.timeout))?;

        finish(&request.url, status, &headers, body)
    }
}

#[async_trait]
impl RequestEngine for ThreadPoolSyncClient {
    fn kind(&self) -> EngineKind {
        EngineKind::ThreadPoolSync
    }

    #[instrument(skip(self, request), fields(url = %request.url, method = %request.method))]
    async fn request(&self, request: &EngineRequest) -> Result<ResponseEnvelope, TransportError> {
        let owned = request.clone();
        debug!("Handing request to blocking pool");
        tokio::task::spawn_blocking(move || Self::execute(&owned)).await?
    }
}
