//! Core of an ad-hoc HTTP request tester with optional polling.
//!
//! # Overview
//! The user fills a `RequestForm` (verb, URL, headers JSON, body JSON). The
//! `Controller` validates it, runs it through the `RequestExecutor`, and
//! publishes the resulting `ResponseState`. Polling repeats the same request
//! on a fixed interval through the `PollScheduler` until it is switched off.
//!
//! # Design
//! - Network I/O sits behind the `HttpClient` trait; `UreqClient` is the
//!   production implementation and tests substitute their own.
//! - Blocking notifications go through an injected `Notifier`.
//! - Malformed headers or body JSON is caught before dispatch.
//! - A non-2xx response with a body is display data, not an error.
//! - Results from a polling session that has been switched off are dropped.

pub mod client;
pub mod controller;
pub mod error;
pub mod executor;
pub mod http;
pub mod notify;
pub mod scheduler;
pub mod types;

pub use client::{HttpClient, UreqClient};
pub use controller::{Controller, FormField, ResponseView};
pub use error::{ErrorKind, ProbeError, TransportError};
pub use executor::{Outcome, RequestExecutor};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use notify::{Notifier, RecordingNotifier, TracingNotifier};
pub use scheduler::{PollPhase, PollScheduler, TaskHandle, MIN_INTERVAL_MS};
pub use types::{DisplayOptions, PollState, RequestConfig, RequestForm, ResponseState};
