//! One request, start to finish.
//!
//! # Design
//! `RequestExecutor::execute` validates, builds the wire descriptor, sends it
//! through the injected `HttpClient`, and classifies what came back. It owns
//! no state; the controller decides what to do with the result. A non-2xx
//! response with a body is an `Outcome`, because the caller wants to see the
//! server's error payload. Only a response with nothing to show, or no
//! response at all, is a `ProbeError`.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::client::HttpClient;
use crate::error::ProbeError;
use crate::http::HttpResponse;
use crate::types::{RequestConfig, RequestForm, ResponseState};

/// A settled request that produced something to display.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx. An empty body is `ResponseState::NoData`.
    Success { status: u16, state: ResponseState },
    /// Non-2xx with a structured (or at least non-empty) body.
    RemoteError { status: u16, body: Value },
}

impl Outcome {
    pub fn status(&self) -> u16 {
        match self {
            Outcome::Success { status, .. } | Outcome::RemoteError { status, .. } => *status,
        }
    }

    /// The response state this outcome replaces the previous one with.
    pub fn state(&self) -> ResponseState {
        match self {
            Outcome::Success { state, .. } => state.clone(),
            Outcome::RemoteError { body, .. } => ResponseState::Data(body.clone()),
        }
    }
}

/// Map a settled response to an outcome.
pub fn classify(response: HttpResponse) -> Result<Outcome, ProbeError> {
    let status = response.status;
    if response.is_success() {
        return Ok(Outcome::Success {
            status,
            state: response.body_value().into(),
        });
    }
    match response.body_value() {
        Some(body) => Ok(Outcome::RemoteError { status, body }),
        None => Err(ProbeError::EmptyErrorResponse { status }),
    }
}

#[derive(Clone)]
pub struct RequestExecutor {
    client: Arc<dyn HttpClient>,
}

impl RequestExecutor {
    pub fn new(client: impl HttpClient + 'static) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn from_shared(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    /// Perform one HTTP call for `config`.
    ///
    /// An empty URL fails before the client is touched.
    pub async fn execute(&self, config: &RequestConfig) -> Result<Outcome, ProbeError> {
        if config.url.trim().is_empty() {
            return Err(ProbeError::EmptyUrl);
        }
        let request = config.to_request();
        let response = self.client.send(&request).await?;
        debug!(method = %request.method, url = %request.url, status = response.status, "request settled");
        classify(response)
    }

    /// Validate raw form input, then execute it.
    pub async fn execute_form(&self, form: &RequestForm) -> Result<Outcome, ProbeError> {
        let config = form.to_config()?;
        self.execute(&config).await
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest};

    /// Records requests and replies with a canned result.
    struct StubClient {
        reply: Result<HttpResponse, TransportError>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl StubClient {
        fn replying(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(HttpResponse {
                    status,
                    headers: Vec::new(),
                    body: body.to_string(),
                }),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(TransportError(message.to_string())),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<HttpRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for StubClient {
        async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }

    fn config(method: HttpMethod, body: Option<Value>) -> RequestConfig {
        RequestConfig {
            method,
            url: "http://localhost:3000/echo".to_string(),
            headers: [("X".to_string(), "1".to_string())].into(),
            body,
        }
    }

    #[tokio::test]
    async fn get_and_delete_send_exactly_one_request_without_body() {
        for method in [HttpMethod::Get, HttpMethod::Delete] {
            let stub = StubClient::replying(200, "{}");
            let executor = RequestExecutor::from_shared(stub.clone());
            executor
                .execute(&config(method, Some(json!({"ignored": true}))))
                .await
                .unwrap();
            let sent = stub.sent();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].method, method);
            assert!(sent[0].body.is_none());
        }
    }

    #[tokio::test]
    async fn post_and_put_attach_body() {
        for method in [HttpMethod::Post, HttpMethod::Put] {
            let stub = StubClient::replying(201, "{}");
            let executor = RequestExecutor::from_shared(stub.clone());
            executor
                .execute(&config(method, Some(json!({"title": "x"}))))
                .await
                .unwrap();
            assert_eq!(stub.sent()[0].body, Some(json!({"title": "x"})));
        }
    }

    #[tokio::test]
    async fn headers_are_forwarded() {
        let stub = StubClient::replying(200, "{}");
        let executor = RequestExecutor::from_shared(stub.clone());
        executor.execute(&config(HttpMethod::Get, None)).await.unwrap();
        assert_eq!(stub.sent()[0].headers["X"], "1");
    }

    #[tokio::test]
    async fn empty_url_makes_no_call() {
        let stub = StubClient::replying(200, "{}");
        let executor = RequestExecutor::from_shared(stub.clone());
        let mut cfg = config(HttpMethod::Get, None);
        cfg.url = String::new();
        let err = executor.execute(&cfg).await.unwrap_err();
        assert!(matches!(err, ProbeError::EmptyUrl));
        assert!(stub.sent().is_empty());
    }

    #[tokio::test]
    async fn malformed_form_makes_no_call() {
        let stub = StubClient::replying(200, "{}");
        let executor = RequestExecutor::from_shared(stub.clone());
        let mut form = RequestForm::new(HttpMethod::Post, "http://localhost");
        form.body = "{".to_string();
        let err = executor.execute_form(&form).await.unwrap_err();
        assert!(matches!(err, ProbeError::MalformedBody(_)));
        assert!(stub.sent().is_empty());
    }

    #[tokio::test]
    async fn error_status_with_body_is_display_data() {
        let stub = StubClient::replying(400, r#"{"error":"bad"}"#);
        let executor = RequestExecutor::from_shared(stub);
        let outcome = executor.execute(&config(HttpMethod::Get, None)).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::RemoteError {
                status: 400,
                body: json!({"error": "bad"})
            }
        );
        assert_eq!(outcome.state(), ResponseState::Data(json!({"error": "bad"})));
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let executor = RequestExecutor::from_shared(StubClient::failing("connection refused"));
        let err = executor.execute(&config(HttpMethod::Get, None)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Transport(m) if m == "connection refused"));
    }

    #[test]
    fn classify_success_variants() {
        let ok = |body: &str| HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        };
        assert_eq!(
            classify(ok(r#"[1,2]"#)).unwrap().state(),
            ResponseState::Data(json!([1, 2]))
        );
        assert_eq!(
            classify(ok("plain")).unwrap().state(),
            ResponseState::Data(json!("plain"))
        );
        assert_eq!(classify(ok("")).unwrap().state(), ResponseState::NoData);
    }

    #[test]
    fn classify_empty_error_body() {
        let response = HttpResponse {
            status: 503,
            headers: Vec::new(),
            body: String::new(),
        };
        let err = classify(response).unwrap_err();
        assert!(matches!(err, ProbeError::EmptyErrorResponse { status: 503 }));
    }
}
