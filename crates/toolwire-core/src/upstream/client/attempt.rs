//! State and decisions shared by the blocking and cooperative call loops.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use toolwire_types::{CallError, ErrorKind};
use tracing::{debug, info_span, warn, Span};
use uuid::Uuid;

use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::rate_limit::RateLimiter;
use crate::resilience::ResilienceContext;
use crate::upstream::classify::classify_status;
use crate::upstream::naming::resolve_upstream;
use crate::upstream::retry::{RetryDecision, RetryPolicy};
use crate::upstream::{CallOptions, UpstreamResponse};

/// What the loop does after one attempt.
#[derive(Debug)]
pub(super) enum AttemptOutcome {
    Done(Result<UpstreamResponse, CallError>),
    Retry { delay: Duration },
}

/// One logical call, resolved against the context.
#[derive(Debug)]
pub(super) struct CallPlan<'a> {
    pub call_id: Uuid,
    pub upstream: String,
    pub options: &'a CallOptions,
    pub policy: RetryPolicy,
    pub breaker: Arc<CircuitBreaker>,
    timeout: Duration,
    deadline: Option<Duration>,
    default_retry_after_secs: u64,
    started: Instant,
}

impl<'a> CallPlan<'a> {
    pub fn new(ctx: &ResilienceContext, options: &'a CallOptions) -> Self {
        let config = ctx.config();
        let upstream = resolve_upstream(options.upstream.as_deref(), &options.url);
        let breaker = ctx.breaker_for(&upstream);

        Self {
            call_id: Uuid::new_v4(),
            policy: RetryPolicy::resolve(options, &config.retry),
            timeout: options.timeout.unwrap_or_else(|| config.http.timeout()),
            deadline: options.deadline.or_else(|| config.deadline()),
            default_retry_after_secs: config.http.rate_limit_retry_after_secs,
            started: Instant::now(),
            upstream,
            options,
            breaker,
        }
    }

    pub fn span(&self) -> Span {
        info_span!(
            "upstream_call",
            call_id = %self.call_id,
            upstream = %self.upstream,
            method = %self.options.method,
        )
    }

    /// Time left before the deadline, if the call has one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_sub(self.started.elapsed()))
    }

    /// Timeout for the next attempt, capped by the deadline.
    pub fn attempt_timeout(&self) -> Result<Duration, CallError> {
        match self.remaining() {
            Some(left) if left.is_zero() => Err(CallError::new(
                ErrorKind::Timeout,
                self.upstream.as_str(),
                "Call deadline exceeded before the next attempt",
            )),
            Some(left) => Ok(self.timeout.min(left)),
            None => Ok(self.timeout),
        }
    }

    /// Reject up front when waiting on `key` would outlast the deadline.
    /// Takes no permit.
    pub fn check_rate_limit_budget(&self, limiter: &RateLimiter, key: &str) -> Result<(), CallError> {
        let Some(left) = self.remaining() else {
            return Ok(());
        };
        let wait = limiter.time_until_available(key, 1);
        if wait.is_zero() || wait < left {
            return Ok(());
        }

        debug!(
            operation = %key,
            wait_ms = wait.as_millis() as u64,
            remaining_ms = left.as_millis() as u64,
            "Rate limit wait would pass the call deadline"
        );
        crate::metrics::record_rate_limit_rejection(key);
        let message = format!(
            "Rate limit {key} needs {:.3}s, call deadline has {:.3}s left",
            wait.as_secs_f64(),
            left.as_secs_f64()
        );
        Err(CallError::new(ErrorKind::RateLimited, self.upstream.as_str(), message)
            .with_retry_after(wait.as_secs_f64().ceil() as u64))
    }

    /// Turn a buffered response into the attempt's result.
    pub fn into_result(
        &self,
        attempt: u32,
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse, CallError> {
        let text = String::from_utf8_lossy(&body);
        if let Some(err) =
            classify_status(status, &headers, &text, &self.upstream, self.default_retry_after_secs)
        {
            return Err(err);
        }

        Ok(UpstreamResponse { status, headers, body, upstream: self.upstream.clone(), attempts: attempt + 1 })
    }

    /// Decide what follows the 0-based `attempt`.
    pub fn settle(&self, attempt: u32, result: Result<UpstreamResponse, CallError>) -> AttemptOutcome {
        let err = match result {
            Ok(response) => {
                debug!(attempt = attempt + 1, status = response.status.as_u16(), "Upstream call succeeded");
                return AttemptOutcome::Done(Ok(response));
            },
            Err(err) => err,
        };

        let decision = self.policy.decide(attempt, &err, self.remaining(), &mut rand::thread_rng());
        match decision {
            RetryDecision::Retry { delay } => {
                warn!(
                    attempt = attempt + 1,
                    max_attempts = self.policy.max_attempts(),
                    kind = %err.kind,
                    status = err.status,
                    delay_ms = delay.as_millis() as u64,
                    error = %err.message,
                    "Upstream call failed, retrying"
                );
                crate::metrics::record_retry(&self.upstream);
                AttemptOutcome::Retry { delay }
            },
            RetryDecision::GiveUp => {
                debug!(attempt = attempt + 1, kind = %err.kind, "Not retrying");
                AttemptOutcome::Done(Err(err))
            },
        }
    }

    /// Record the final outcome and hand it back.
    pub fn finish(
        &self,
        result: Result<UpstreamResponse, CallError>,
    ) -> Result<UpstreamResponse, CallError> {
        let elapsed = self.started.elapsed();
        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.kind.as_str(),
        };
        crate::metrics::record_call(&self.upstream, outcome, elapsed);

        if let Err(err) = &result {
            warn!(
                kind = %err.kind,
                status = err.status,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %err.message,
                "Upstream call failed"
            );
        }
        result
    }
}
