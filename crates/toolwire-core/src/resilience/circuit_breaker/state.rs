//! Circuit breaker state machine.
//!
//! `BreakerCore::apply` is the only place state changes. The blocking and
//! async adapters in `mod.rs` feed it events under the breaker mutex and act
//! on the returned [`Step`].

use std::time::{Duration, Instant};
use toolwire_types::CircuitState;

/// Thresholds for one breaker, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerPolicy {
    /// Consecutive failures in CLOSED before opening
    pub failure_threshold: u32,
    /// Time spent OPEN before a probe is admitted
    pub timeout: Duration,
    /// Consecutive successes in HALF_OPEN before closing
    pub success_threshold: u32,
}

/// Something that happened to a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BreakerEvent {
    /// A caller asks to run a call
    Admit,
    /// An admitted call succeeded
    Success,
    /// An admitted call failed in a way that counts against the upstream
    Failure,
}

/// What the adapter should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Run the call
    Admitted,
    /// Fail fast; the breaker will admit a probe after `retry_in`
    Rejected { retry_in: Duration },
    /// Outcome bookkeeping done
    Recorded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    pub verdict: Verdict,
    /// `(from, to)` when the event changed the state
    pub transition: Option<(CircuitState, CircuitState)>,
}

impl Step {
    const fn stay(verdict: Verdict) -> Self {
        Self { verdict, transition: None }
    }

    const fn moved(verdict: Verdict, from: CircuitState, to: CircuitState) -> Self {
        Self { verdict, transition: Some((from, to)) }
    }
}

/// Mutable part of a breaker.
#[derive(Debug, Clone)]
pub(crate) struct BreakerCore {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure: Option<Instant>,
    pub total_trips: u64,
}

impl Default for BreakerCore {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure: None,
            total_trips: 0,
        }
    }
}

impl BreakerCore {
    /// Apply one event at time `now`.
    pub fn apply(&mut self, policy: &BreakerPolicy, event: BreakerEvent, now: Instant) -> Step {
        match event {
            BreakerEvent::Admit => self.admit(policy, now),
            BreakerEvent::Success => self.succeed(policy),
            BreakerEvent::Failure => self.fail(policy, now),
        }
    }

    fn admit(&mut self, policy: &BreakerPolicy, now: Instant) -> Step {
        if self.state != CircuitState::Open {
            return Step::stay(Verdict::Admitted);
        }

        let elapsed = self.last_failure.map_or(policy.timeout, |at| now.saturating_duration_since(at));
        if elapsed >= policy.timeout {
            self.state = CircuitState::HalfOpen;
            self.success_count = 0;
            return Step::moved(Verdict::Admitted, CircuitState::Open, CircuitState::HalfOpen);
        }

        Step::stay(Verdict::Rejected { retry_in: policy.timeout - elapsed })
    }

    fn succeed(&mut self, policy: &BreakerPolicy) -> Step {
        match self.state {
            CircuitState::Closed => {
                self.failure_count = 0;
                Step::stay(Verdict::Recorded)
            },
            CircuitState::HalfOpen => {
                self.success_count = self.success_count.saturating_add(1);
                if self.success_count < policy.success_threshold {
                    return Step::stay(Verdict::Recorded);
                }
                self.state = CircuitState::Closed;
                self.failure_count = 0;
                self.success_count = 0;
                Step::moved(Verdict::Recorded, CircuitState::HalfOpen, CircuitState::Closed)
            },
            // A call admitted before another caller tripped the breaker.
            CircuitState::Open => Step::stay(Verdict::Recorded),
        }
    }

    fn fail(&mut self, policy: &BreakerPolicy, now: Instant) -> Step {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure = Some(now);

        match self.state {
            CircuitState::Closed if self.failure_count >= policy.failure_threshold => {
                self.state = CircuitState::Open;
                self.total_trips += 1;
                Step::moved(Verdict::Recorded, CircuitState::Closed, CircuitState::Open)
            },
            CircuitState::HalfOpen => {
                self.state = CircuitState::Open;
                self.success_count = 0;
                self.total_trips += 1;
                Step::moved(Verdict::Recorded, CircuitState::HalfOpen, CircuitState::Open)
            },
            CircuitState::Closed | CircuitState::Open => Step::stay(Verdict::Recorded),
        }
    }
}
