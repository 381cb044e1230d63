//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the controller with
//! the real `UreqClient` over HTTP. Validates that request building, the
//! ureq transport and response classification agree with an actual server.

use std::sync::Arc;
use std::time::Duration;

use probe_core::{
    Controller, HttpMethod, Outcome, PollPhase, ProbeError, RecordingNotifier, ResponseState,
    UreqClient,
};
use serde_json::json;
use tokio::net::TcpListener;

/// Start the mock server on a random port and return its base URL.
async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { mock_server::run(listener).await });
    format!("http://{addr}")
}

fn controller(url: &str) -> (Controller, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let client = UreqClient::with_timeout(Duration::from_secs(5));
    let mut controller = Controller::new(client, notifier.clone());
    controller.set_url(url);
    (controller, notifier)
}

#[tokio::test(flavor = "multi_thread")]
async fn get_echoes_headers_without_body() {
    let base = start_server().await;
    let (mut controller, notifier) = controller(&format!("{base}/echo"));
    controller.set_headers(r#"{"X-Probe":"1"}"#);
    controller.set_body(r#"{"never":"sent"}"#);

    let outcome = controller.submit().await.unwrap();

    assert!(matches!(outcome, Outcome::Success { status: 200, .. }));
    let view = controller.response();
    let echo = view.state.value().unwrap();
    assert_eq!(echo["method"], "GET");
    assert_eq!(echo["headers"]["x-probe"], "1");
    assert!(echo["body"].is_null());
    assert!(notifier.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn post_sends_json_body() {
    let base = start_server().await;
    let (mut controller, _) = controller(&format!("{base}/echo"));
    controller.set_method(HttpMethod::Post);
    controller.set_body(r#"{"title":"Integration test","done":false}"#);

    controller.submit().await.unwrap();

    let echo = controller.response().state.value().cloned().unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["headers"]["content-type"], "application/json");
    assert_eq!(echo["body"], json!({"title": "Integration test", "done": false}));
}

#[tokio::test(flavor = "multi_thread")]
async fn put_respects_user_content_type() {
    let base = start_server().await;
    let (mut controller, _) = controller(&format!("{base}/echo"));
    controller.set_method(HttpMethod::Put);
    controller.set_headers(r#"{"Content-Type":"application/merge-patch+json"}"#);
    controller.set_body(r#"{"done":true}"#);

    controller.submit().await.unwrap();

    let echo = controller.response().state.value().cloned().unwrap();
    assert_eq!(echo["method"], "PUT");
    assert_eq!(echo["headers"]["content-type"], "application/merge-patch+json");
    assert_eq!(echo["body"], json!({"done": true}));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_sends_no_body() {
    let base = start_server().await;
    let (mut controller, _) = controller(&format!("{base}/echo"));
    controller.set_method(HttpMethod::Delete);
    controller.set_body(r#"{"never":"sent"}"#);

    controller.submit().await.unwrap();

    let echo = controller.response().state.value().cloned().unwrap();
    assert_eq!(echo["method"], "DELETE");
    assert!(echo["body"].is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn error_status_body_is_shown() {
    let base = start_server().await;
    let (mut controller, notifier) = controller(&format!("{base}/status/422"));

    let outcome = controller.submit().await.unwrap();

    assert!(matches!(outcome, Outcome::RemoteError { status: 422, .. }));
    assert_eq!(
        controller.response().state,
        ResponseState::Data(json!({"error": "Unprocessable Entity", "status": 422}))
    );
    assert!(notifier.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_error_response_is_notified() {
    let base = start_server().await;
    let (mut controller, notifier) = controller(&format!("{base}/empty/503"));

    let err = controller.submit().await.unwrap_err();

    assert!(matches!(err, ProbeError::EmptyErrorResponse { status: 503 }));
    assert!(controller.response().state.is_empty());
    assert_eq!(notifier.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn plain_text_is_shown_as_string() {
    let base = start_server().await;
    let (mut controller, _) = controller(&format!("{base}/text"));

    controller.submit().await.unwrap();

    assert_eq!(controller.response().state, ResponseState::Data(json!("pong")));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_host_is_a_transport_failure() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (mut controller, notifier) = controller(&format!("http://{addr}/echo"));
    let err = controller.submit().await.unwrap_err();

    assert!(matches!(err, ProbeError::Transport(_)));
    assert!(controller.response().state.is_empty());
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("failed to fetch data from the API"));
    assert!(!controller.is_loading());
}

#[tokio::test(flavor = "multi_thread")]
async fn polling_hits_the_server_until_disabled() {
    let base = start_server().await;
    let (mut controller, notifier) = controller(&format!("{base}/hits"));

    controller.enable_polling().unwrap();
    controller.set_poll_interval(50).unwrap();
    controller.confirm_polling().unwrap();
    assert_eq!(controller.poll_phase(), PollPhase::Running);

    let mut rx = controller.subscribe();
    let mut seen = 0;
    while seen < 3 {
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("no poll result within 5s")
            .unwrap();
        if let Some(hits) = rx.borrow_and_update().state.value() {
            seen = hits["hits"].as_u64().unwrap();
        }
    }
    controller.disable_polling();
    let count = controller.poll_state().count;
    assert!(count >= 3, "count was {count}");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(controller.poll_state().count, count);
    assert!(notifier.is_empty());
}
