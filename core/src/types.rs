//! Form, request and display state.
//!
//! # Design
//! `RequestForm` holds exactly what the user typed. Turning it into a
//! `RequestConfig` is the single place where input is validated: the URL
//! must be non-empty, headers must be a JSON object, and the body is parsed
//! only for verbs that send one. Malformed JSON is reported here, before
//! anything is dispatched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProbeError;
use crate::http::{HttpMethod, HttpRequest};
use crate::scheduler::DEFAULT_INTERVAL_MS;

/// Raw user input for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestForm {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: String,
    #[serde(default)]
    pub body: String,
}

impl RequestForm {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Validate the form and parse its JSON fields.
    pub fn to_config(&self) -> Result<RequestConfig, ProbeError> {
        if !self.has_url() {
            return Err(ProbeError::EmptyUrl);
        }
        let headers = parse_headers(&self.headers)?;
        let body = if self.method.carries_body() {
            parse_body(&self.body)?
        } else {
            None
        };
        Ok(RequestConfig {
            method: self.method,
            url: self.url.trim().to_string(),
            headers,
            body,
        })
    }
}

/// A validated request, ready to be dispatched any number of times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestConfig {
    /// Build the wire descriptor. The body is attached only when the
    /// selected method carries one.
    pub fn to_request(&self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: if self.method.carries_body() {
                self.body.clone()
            } else {
                None
            },
        }
    }
}

/// Parse headers text into a header map. Blank text yields an empty map.
///
/// Numbers and booleans are accepted and converted to their JSON text.
pub fn parse_headers(text: &str) -> Result<BTreeMap<String, String>, ProbeError> {
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProbeError::MalformedHeaders(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(ProbeError::MalformedHeaders(
            "expected a JSON object".to_string(),
        ));
    };
    map.into_iter()
        .map(|(name, value)| match value {
            Value::String(s) => Ok((name, s)),
            Value::Number(n) => Ok((name, n.to_string())),
            Value::Bool(b) => Ok((name, b.to_string())),
            other => Err(ProbeError::MalformedHeaders(format!(
                "header {name:?} has a non-scalar value: {other}"
            ))),
        })
        .collect()
}

/// Parse body text as JSON. Blank text means no body.
pub fn parse_body(text: &str) -> Result<Option<Value>, ProbeError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| ProbeError::MalformedBody(e.to_string()))
}

/// The last value received, or nothing yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ResponseState {
    #[default]
    NoData,
    Data(Value),
}

impl ResponseState {
    pub fn value(&self) -> Option<&Value> {
        match self {
            ResponseState::NoData => None,
            ResponseState::Data(v) => Some(v),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseState::NoData)
    }
}

impl From<Option<Value>> for ResponseState {
    fn from(value: Option<Value>) -> Self {
        value.map_or(ResponseState::NoData, ResponseState::Data)
    }
}

/// Snapshot of the polling controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollState {
    pub enabled: bool,
    pub interval_ms: u64,
    pub count: u64,
}

impl Default for PollState {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: DEFAULT_INTERVAL_MS,
            count: 0,
        }
    }
}

/// Toggles passed through to the JSON tree view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayOptions {
    pub enable_clipboard: bool,
    pub display_data_types: bool,
    pub display_object_size: bool,
}
