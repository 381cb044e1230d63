//! Error types for the request tester.
//!
//! # Design
//! Every failure is local to a single executor call or controller action.
//! `ErrorKind` groups the variants the way they are reported: validation
//! and malformed input are caught before anything is sent, remote and
//! transport errors come back from the wire. A non-2xx response that carries
//! a body is not an error at all; it is display data (see `Outcome`).

use thiserror::Error;

use crate::scheduler::MIN_INTERVAL_MS;

/// How an error is classified for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    MalformedInput,
    Remote,
    Transport,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    /// Nothing to send to.
    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("polling interval must be at least {}ms, got {0}ms", MIN_INTERVAL_MS)]
    IntervalTooShort(u64),

    #[error("unknown HTTP method: {0}")]
    UnknownMethod(String),

    /// A manual submit arrived while a request or polling session is active.
    #[error("a request is already in progress")]
    Busy,

    /// A polling control was used from a state that does not accept it.
    #[error("cannot {action} while polling is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    #[error("headers must be a JSON object of strings: {0}")]
    MalformedHeaders(String),

    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),

    /// Non-2xx status with nothing to display.
    #[error("HTTP {status} with an empty body")]
    EmptyErrorResponse { status: u16 },

    /// No response at all: DNS, connect, TLS or timeout failure.
    #[error("failed to fetch data from the API: {0}")]
    Transport(String),
}

impl ProbeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::EmptyUrl
            | ProbeError::IntervalTooShort(_)
            | ProbeError::UnknownMethod(_)
            | ProbeError::Busy
            | ProbeError::InvalidTransition { .. } => ErrorKind::Validation,
            ProbeError::MalformedHeaders(_) | ProbeError::MalformedBody(_) => {
                ErrorKind::MalformedInput
            }
            ProbeError::EmptyErrorResponse { .. } => ErrorKind::Remote,
            ProbeError::Transport(_) => ErrorKind::Transport,
        }
    }
}

/// Failure reported by an `HttpClient` when no response was received.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<TransportError> for ProbeError {
    fn from(e: TransportError) -> Self {
        ProbeError::Transport(e.0)
    }
}
