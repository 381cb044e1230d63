//! The HTTP client seam.
//!
//! # Design
//! The executor depends only on `HttpClient`: send a described request,
//! get back a settled response of any status, or a `TransportError` when no
//! response arrived. `UreqClient` is the production implementation. ureq is
//! blocking, so each call runs on tokio's blocking pool and overlapping
//! polling ticks do not stall the timer.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use ureq::typestate::WithBody;
use ureq::RequestBuilder;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Sends one request and settles with a response or a transport failure.
///
/// Non-2xx statuses are responses, not errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `HttpClient` backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        // Status codes are data here; the executor decides what a 4xx means.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl std::fmt::Debug for UreqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqClient").finish_non_exhaustive()
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for UreqClient {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || execute(&agent, &request))
            .await
            .map_err(|e| TransportError(format!("request task failed: {e}")))?
    }
}

fn execute(agent: &ureq::Agent, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
    debug!(method = %req.method, url = %req.url, headers = req.headers.len(), "sending request");

    let result = match req.method {
        HttpMethod::Get => with_headers(agent.get(req.url.as_str()), req).call(),
        HttpMethod::Delete => with_headers(agent.delete(req.url.as_str()), req).call(),
        HttpMethod::Post => send_body(with_headers(agent.post(req.url.as_str()), req), req)?,
        HttpMethod::Put => send_body(with_headers(agent.put(req.url.as_str()), req), req)?,
    };
    let mut response = result.map_err(|e| TransportError(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| TransportError(format!("reading response body: {e}")))?;

    debug!(status, bytes = body.len(), "received response");
    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn with_headers<B>(mut builder: RequestBuilder<B>, req: &HttpRequest) -> RequestBuilder<B> {
    for (name, value) in &req.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(
    builder: RequestBuilder<WithBody>,
    req: &HttpRequest,
) -> Result<Result<ureq::http::Response<ureq::Body>, ureq::Error>, TransportError> {
    let Some(body) = &req.body else {
        return Ok(builder.send_empty());
    };
    let bytes = serde_json::to_vec(body)
        .map_err(|e| TransportError(format!("serializing request body: {e}")))?;
    let builder = if req.has_content_type() {
        builder
    } else {
        builder.content_type("application/json")
    };
    Ok(builder.send(&bytes[..]))
}
