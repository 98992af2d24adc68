//! Classified upstream call errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Longest response body kept on an error, in bytes.
const MAX_ERROR_BODY_BYTES: usize = 2048;

/// Failure class assigned to every raw error or non-2xx response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Connection refused, DNS failure, broken body stream
    #[serde(rename = "TRANSPORT")]
    Transport,
    /// The per-attempt timeout elapsed
    #[serde(rename = "TIMEOUT")]
    Timeout,
    /// 4xx other than 429
    #[serde(rename = "CLIENT_4XX")]
    Client4xx,
    /// 429 from upstream, or a local rate-limit rejection
    #[serde(rename = "RATE_LIMITED")]
    RateLimited,
    /// 5xx from upstream
    #[serde(rename = "SERVER_5XX")]
    Server5xx,
    /// The upstream's circuit breaker rejected the call
    #[serde(rename = "CIRCUIT_OPEN")]
    CircuitOpen,
    /// Anything unclassified
    #[serde(rename = "INTERNAL")]
    Internal,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "TRANSPORT",
            Self::Timeout => "TIMEOUT",
            Self::Client4xx => "CLIENT_4XX",
            Self::RateLimited => "RATE_LIMITED",
            Self::Server5xx => "SERVER_5XX",
            Self::CircuitOpen => "CIRCUIT_OPEN",
            Self::Internal => "INTERNAL",
        }
    }

    /// Connection-level failures, retried under `retry_on_network`.
    pub const fn is_network(self) -> bool {
        matches!(self, Self::Transport | Self::Timeout)
    }

    /// Whether this failure says something about upstream health.
    ///
    /// Client errors and local problems leave the breaker untouched.
    pub const fn trips_breaker(self) -> bool {
        matches!(self, Self::Transport | Self::Timeout | Self::Server5xx | Self::RateLimited)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure of one outbound call.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{kind} from {upstream}: {message}")]
pub struct CallError {
    pub kind: ErrorKind,
    /// Logical upstream the call was addressed to
    pub upstream: String,
    pub message: String,
    /// HTTP status, when the failure came from a response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Seconds the caller should wait before trying again
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    /// Truncated response body, for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl CallError {
    pub fn new(kind: ErrorKind, upstream: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            upstream: upstream.into(),
            message: message.into(),
            status: None,
            retry_after_secs: None,
            body: None,
        }
    }

    /// Build an error of `kind` whose message is the cause chain of `cause`.
    pub fn from_cause(
        kind: ErrorKind,
        upstream: impl Into<String>,
        cause: &(dyn std::error::Error + 'static),
    ) -> Self {
        let mut message = cause.to_string();
        let mut source = cause.source();
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        Self::new(kind, upstream, message)
    }

    /// Wrap an unexpected failure, keeping its cause chain as text.
    pub fn internal(upstream: impl Into<String>, cause: &(dyn std::error::Error + 'static)) -> Self {
        Self::from_cause(ErrorKind::Internal, upstream, cause)
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: &str) -> Self {
        if body.is_empty() {
            return self;
        }
        let mut end = body.len().min(MAX_ERROR_BODY_BYTES);
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        self.body = Some(body[..end].to_string());
        self
    }

    pub fn is_circuit_open(&self) -> bool {
        self.kind == ErrorKind::CircuitOpen
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_secs.map(Duration::from_secs)
    }

    /// Get the HTTP status a gateway should answer with for this error.
    pub fn http_status_code(&self) -> u16 {
        match self.kind {
            ErrorKind::Transport | ErrorKind::Server5xx => 502,
            ErrorKind::Timeout => 504,
            ErrorKind::Client4xx => self.status.unwrap_or(400),
            ErrorKind::RateLimited => 429,
            ErrorKind::CircuitOpen => 503,
            ErrorKind::Internal => 500,
        }
    }
}

/// Rejection produced by an open circuit breaker before any work is done.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Circuit breaker open for {name}, retry in {}ms", .retry_in.as_millis())]
pub struct CircuitOpenError {
    /// Breaker name (the upstream)
    pub name: String,
    /// Time left until the breaker will admit a probe
    pub retry_in: Duration,
}

impl From<CircuitOpenError> for CallError {
    fn from(err: CircuitOpenError) -> Self {
        let secs = err.retry_in.as_secs() + u64::from(err.retry_in.subsec_nanos() > 0);
        let message = err.to_string();
        Self::new(ErrorKind::CircuitOpen, err.name, message).with_retry_after(secs)
    }
}
