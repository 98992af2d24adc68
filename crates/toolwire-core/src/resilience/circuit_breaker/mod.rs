//! Circuit Breaker implementation for upstream-level fast-fail behavior
//!
//! When an upstream experiences several consecutive failures, its breaker
//! opens and subsequent calls fail fast without touching the network.
//!
//! States:
//! - Closed: Normal operation, calls pass through
//! - Open: Upstream is failing, calls fail immediately
//! - Half-Open: Testing if the upstream has recovered
//!
//! The OPEN→HALF_OPEN move happens lazily when a call asks to be admitted;
//! there is no background timer. The mutex is held only while the state
//! machine runs, never while the wrapped call executes, so the same breaker
//! is safe to share between blocking threads and tokio tasks.

mod manager;
mod state;

#[cfg(test)]
mod tests;

pub use manager::CircuitBreakerManager;
pub use state::BreakerPolicy;

use chrono::Utc;
use parking_lot::Mutex;
use std::future::Future;
use std::time::{Duration, Instant};
use toolwire_types::{BreakerSnapshot, CircuitOpenError, CircuitState};
use tracing::{debug, info, warn};

use state::{BreakerCore, BreakerEvent, Verdict};

/// Breaker guarding one upstream.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    policy: BreakerPolicy,
    core: Mutex<BreakerCore>,
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        failure_threshold: u32,
        timeout: Duration,
        success_threshold: u32,
    ) -> Self {
        Self::with_policy(name, BreakerPolicy { failure_threshold, timeout, success_threshold })
    }

    pub fn with_policy(name: impl Into<String>, policy: BreakerPolicy) -> Self {
        Self { name: name.into(), policy, core: Mutex::new(BreakerCore::default()) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &BreakerPolicy {
        &self.policy
    }

    /// Current state as last recorded. An expired OPEN state is reported as
    /// OPEN until the next call asks to be admitted.
    pub fn state(&self) -> CircuitState {
        self.core.lock().state
    }

    /// Run `f` through the breaker; every `Err` counts as a failure.
    pub fn call<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<CircuitOpenError>,
    {
        self.call_with(f, |_| true)
    }

    /// Run `f` through the breaker; only errors for which `is_failure`
    /// returns true count against the upstream. Other errors are recorded as
    /// successes, since the upstream answered.
    pub fn call_with<T, E, F, P>(&self, f: F, is_failure: P) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<CircuitOpenError>,
        P: FnOnce(&E) -> bool,
    {
        self.admit()?;
        let result = f();
        self.settle(&result, is_failure);
        result
    }

    /// Async form of [`CircuitBreaker::call`]; the breaker lock is never held
    /// across the `.await`.
    pub async fn call_async<T, E, F, Fut>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError>,
    {
        self.call_async_with(f, |_| true).await
    }

    /// Async form of [`CircuitBreaker::call_with`].
    pub async fn call_async_with<T, E, F, Fut, P>(&self, f: F, is_failure: P) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError>,
        P: FnOnce(&E) -> bool,
    {
        self.admit()?;
        let result = f().await;
        self.settle(&result, is_failure);
        result
    }

    /// Ask to run a call. Resolves OPEN→HALF_OPEN when the timeout has passed.
    pub fn admit(&self) -> Result<(), CircuitOpenError> {
        let step = {
            let mut core = self.core.lock();
            core.apply(&self.policy, BreakerEvent::Admit, Instant::now())
        };
        self.announce(step.transition);

        match step.verdict {
            Verdict::Rejected { retry_in } => {
                debug!(breaker = %self.name, retry_in_ms = retry_in.as_millis() as u64, "Circuit open, failing fast");
                Err(CircuitOpenError { name: self.name.clone(), retry_in })
            },
            Verdict::Admitted | Verdict::Recorded => Ok(()),
        }
    }

    pub fn record_success(&self) {
        self.record(BreakerEvent::Success);
    }

    pub fn record_failure(&self) {
        self.record(BreakerEvent::Failure);
    }

    /// Read-only copy for health reporting.
    pub fn get_stats(&self) -> BreakerSnapshot {
        let core = self.core.lock().clone();
        let last_failure_time = core.last_failure.and_then(|at| {
            chrono::Duration::from_std(at.elapsed()).ok().map(|ago| Utc::now() - ago)
        });

        BreakerSnapshot {
            name: self.name.clone(),
            state: core.state,
            failure_count: core.failure_count,
            success_count: core.success_count,
            failure_threshold: self.policy.failure_threshold,
            success_threshold: self.policy.success_threshold,
            timeout_secs: self.policy.timeout.as_secs_f64(),
            last_failure_time,
            total_trips: core.total_trips,
        }
    }

    /// Force CLOSED with zeroed counters. Trip history is kept.
    pub fn reset(&self) {
        let previous = {
            let mut core = self.core.lock();
            let previous = core.state;
            let total_trips = core.total_trips;
            *core = BreakerCore { total_trips, ..BreakerCore::default() };
            previous
        };

        info!(breaker = %self.name, previous_state = %previous, "Circuit breaker reset manually");
        if previous != CircuitState::Closed {
            crate::metrics::record_breaker_transition(&self.name, CircuitState::Closed);
        }
    }

    fn settle<T, E, P>(&self, result: &Result<T, E>, is_failure: P)
    where
        P: FnOnce(&E) -> bool,
    {
        let failed = match result {
            Ok(_) => false,
            Err(e) => is_failure(e),
        };
        self.record(if failed { BreakerEvent::Failure } else { BreakerEvent::Success });
    }

    fn record(&self, event: BreakerEvent) {
        let step = {
            let mut core = self.core.lock();
            core.apply(&self.policy, event, Instant::now())
        };
        self.announce(step.transition);
    }

    fn announce(&self, transition: Option<(CircuitState, CircuitState)>) {
        let Some((from, to)) = transition else {
            return;
        };

        match to {
            CircuitState::Open => warn!(
                breaker = %self.name,
                from = %from,
                timeout_secs = self.policy.timeout.as_secs_f64(),
                "Circuit breaker opening"
            ),
            CircuitState::HalfOpen => {
                info!(breaker = %self.name, "Circuit breaker half-open, probing recovery");
            },
            CircuitState::Closed => {
                info!(breaker = %self.name, "Circuit breaker closing - upstream recovered");
            },
        }
        crate::metrics::record_breaker_transition(&self.name, to);
    }
}
