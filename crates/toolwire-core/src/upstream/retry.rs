//! Retry decisions for the call wrapper.
//!
//! `RetryPolicy::decide` is pure apart from the jitter source, so the whole
//! retry table can be tested without a network.

use rand::Rng;
use std::time::Duration;
use toolwire_types::{CallError, ErrorKind, RetryConfig};

use super::CallOptions;

/// Exponential backoff: `min(base × multiplier^attempt, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Backoff {
    /// Delay before retrying after the 0-based `attempt` failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            return self.max;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(self.max)
    }

    /// [`Backoff::delay`] scaled by a uniform factor in `[0.5, 1.5]`.
    pub fn jittered<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let delay = self.delay(attempt);
        let factor: f64 = rng.gen_range(0.5..=1.5);
        Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

/// Resolved retry settings for one call.
#[derive(Debug, Clone, PartialEq)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Each bool is an independent retry switch for one error class"
)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub allow_retries: bool,
    pub retry_on_4xx: bool,
    pub retry_on_5xx: bool,
    pub retry_on_network: bool,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Per-call overrides on top of configured defaults.
    pub fn resolve(options: &CallOptions, defaults: &RetryConfig) -> Self {
        Self {
            max_retries: options.max_retries.unwrap_or(defaults.max_retries),
            allow_retries: options.allow_retries,
            retry_on_4xx: options.retry_on_4xx.unwrap_or(defaults.retry_on_4xx),
            retry_on_5xx: options.retry_on_5xx.unwrap_or(defaults.retry_on_5xx),
            retry_on_network: options.retry_on_network.unwrap_or(defaults.retry_on_network),
            backoff: Backoff {
                base: options
                    .backoff_base
                    .unwrap_or_else(|| secs_or_zero(defaults.backoff_base_secs)),
                max: options.backoff_max.unwrap_or_else(|| secs_or_zero(defaults.backoff_max_secs)),
                multiplier: options.backoff_multiplier.unwrap_or(defaults.backoff_multiplier),
            },
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether this kind of failure is worth another attempt.
    pub fn is_retryable(&self, err: &CallError) -> bool {
        match err.kind {
            kind if kind.is_network() => self.retry_on_network,
            ErrorKind::Server5xx => self.retry_on_5xx,
            // Local rejections carry no status and are never retried.
            ErrorKind::RateLimited => self.retry_on_5xx && err.status.is_some(),
            ErrorKind::Client4xx => self.retry_on_4xx,
            ErrorKind::CircuitOpen | ErrorKind::Internal => false,
            ErrorKind::Transport | ErrorKind::Timeout => self.retry_on_network,
        }
    }

    /// Decide what follows the failure of the 0-based `attempt`.
    ///
    /// `remaining` is the time left before the call's deadline, if it has one;
    /// a retry whose backoff would end past it is not attempted.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        attempt: u32,
        err: &CallError,
        remaining: Option<Duration>,
        rng: &mut R,
    ) -> RetryDecision {
        if err.is_circuit_open() || !self.allow_retries || !self.is_retryable(err) {
            return RetryDecision::GiveUp;
        }
        if attempt.saturating_add(1) >= self.max_attempts() {
            return RetryDecision::GiveUp;
        }

        let delay = self.backoff.jittered(attempt, rng);
        match remaining {
            Some(left) if delay >= left => RetryDecision::GiveUp,
            _ => RetryDecision::Retry { delay },
        }
    }
}

fn secs_or_zero(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}
