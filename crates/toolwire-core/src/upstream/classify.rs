//! Maps raw transport errors and non-success responses to exactly one
//! [`ErrorKind`]. Both execution modes go through these functions.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use toolwire_types::{CallError, ErrorKind};

/// Classify a response status. `None` means the response is a success.
///
/// Redirects are followed by the HTTP client, so a 3xx seen here (a 304, or
/// a redirect without `Location`) is unclassified and becomes INTERNAL.
pub fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    upstream: &str,
    default_retry_after_secs: u64,
) -> Option<CallError> {
    if status.is_success() {
        return None;
    }

    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("unknown status");
    let message = format!("HTTP {code} {reason}");

    let error = if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()))
            .unwrap_or(default_retry_after_secs);
        CallError::new(ErrorKind::RateLimited, upstream, message).with_retry_after(retry_after)
    } else if status.is_server_error() {
        CallError::new(ErrorKind::Server5xx, upstream, message)
    } else if status.is_client_error() {
        CallError::new(ErrorKind::Client4xx, upstream, message)
    } else {
        CallError::new(ErrorKind::Internal, upstream, format!("Unexpected {message}"))
    };

    Some(error.with_status(code).with_body(body))
}

/// Classify a reqwest failure that produced no response.
pub fn classify_transport(err: &reqwest::Error, upstream: &str) -> CallError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_builder() {
        ErrorKind::Internal
    } else {
        ErrorKind::Transport
    };
    CallError::from_cause(kind, upstream, err)
}

/// Parse a `Retry-After` value into whole seconds: delay seconds (integer or
/// fractional, rounded up) or an HTTP date relative to `now`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }
    if let Ok(secs) = value.parse::<f64>() {
        return (secs.is_finite() && secs >= 0.0).then(|| secs.ceil() as u64);
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let secs = (at.with_timezone(&Utc) - now).num_seconds();
    Some(u64::try_from(secs).unwrap_or(0))
}
