use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl BucketState {
    fn refill(&mut self, max_tokens: f64, refill_rate: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(max_tokens);
        // A stale `now` must not move the clock backwards.
        if now > self.last_refill {
            self.last_refill = now;
        }
    }
}

/// Token bucket that grants up to `max_tokens` permits at once and refills
/// continuously at `refill_rate` tokens per second. Refill is computed
/// lazily on every access.
#[derive(Debug)]
pub struct TokenBucket {
    max_tokens: u32,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(max_tokens: u32, refill_rate: f64) -> Self {
        Self::new_at(max_tokens, refill_rate, Instant::now())
    }

    pub(crate) fn new_at(max_tokens: u32, refill_rate: f64, now: Instant) -> Self {
        Self {
            max_tokens,
            refill_rate,
            state: Mutex::new(BucketState { tokens: f64::from(max_tokens), last_refill: now }),
        }
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Take `n` permits if all of them are available. Nothing is consumed on
    /// failure.
    pub fn acquire(&self, n: u32) -> bool {
        self.acquire_at(n, Instant::now())
    }

    pub(crate) fn acquire_at(&self, n: u32, now: Instant) -> bool {
        let needed = f64::from(n);
        let mut state = self.state.lock();
        state.refill(f64::from(self.max_tokens), self.refill_rate, now);
        if state.tokens >= needed {
            state.tokens -= needed;
            true
        } else {
            false
        }
    }

    /// Time until `n` permits will be available, zero if they already are.
    ///
    /// Returns `Duration::MAX` when the bucket never refills.
    pub fn time_until_available(&self, n: u32) -> Duration {
        self.time_until_available_at(n, Instant::now())
    }

    pub(crate) fn time_until_available_at(&self, n: u32, now: Instant) -> Duration {
        let needed = f64::from(n);
        let tokens = {
            let mut state = self.state.lock();
            state.refill(f64::from(self.max_tokens), self.refill_rate, now);
            state.tokens
        };

        if tokens >= needed {
            return Duration::ZERO;
        }
        if self.refill_rate <= 0.0 {
            return Duration::MAX;
        }
        Duration::try_from_secs_f64((needed - tokens) / self.refill_rate).unwrap_or(Duration::MAX)
    }

    /// Tokens currently available, after refill.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        state.refill(f64::from(self.max_tokens), self.refill_rate, Instant::now());
        state.tokens
    }
}
