//! A small JSON server to point the request tester at.
//!
//! Every route answers with something the tester has to handle: echoed
//! requests, structured error bodies, empty error responses, plain text,
//! slow replies, and a hit counter for watching polling.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const ROUTES: [&str; 6] = [
    "ANY /echo",
    "GET /status/{code}",
    "GET /empty/{code}",
    "GET /hits",
    "GET /text",
    "GET /slow/{ms}",
];

/// What `/echo` saw.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub request_id: Uuid,
    pub method: String,
    pub headers: Map<String, Value>,
    /// Parsed JSON, the raw text if it was not JSON, or null when empty.
    pub body: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hits {
    pub hits: u64,
}

#[derive(Clone, Default)]
struct AppState {
    hits: Arc<AtomicU64>,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", get(status))
        .route("/empty/{code}", get(empty))
        .route("/hits", get(hits))
        .route("/text", get(text))
        .route("/slow/{ms}", get(slow))
        .with_state(AppState::default())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    Json(Echo {
        request_id: Uuid::new_v4(),
        method: method.to_string(),
        headers,
        body,
    })
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    let reason = status.canonical_reason().unwrap_or("unknown");
    Ok((
        status,
        Json(serde_json::json!({ "error": reason, "status": code })),
    ))
}

async fn empty(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn hits(State(state): State<AppState>) -> Json<Hits> {
    let hits = state.hits.fetch_add(1, Ordering::SeqCst) + 1;
    Json(Hits { hits })
}

async fn text() -> &'static str {
    "pong"
}

async fn slow(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "slept_ms": ms }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_serializes_to_json() {
        let echo = Echo {
            request_id: Uuid::nil(),
            method: "POST".to_string(),
            headers: Map::new(),
            body: serde_json::json!({"a": 1}),
        };
        let json = serde_json::to_value(&echo).unwrap();
        assert_eq!(json["request_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["method"], "POST");
        assert_eq!(json["body"]["a"], 1);
    }

    #[test]
    fn hits_roundtrips_through_json() {
        let back: Hits = serde_json::from_str(r#"{"hits":7}"#).unwrap();
        assert_eq!(back.hits, 7);
    }

    #[test]
    fn routes_are_listed() {
        assert!(ROUTES.iter().any(|r| r.ends_with("/echo")));
        assert_eq!(ROUTES.len(), 6);
    }
}
