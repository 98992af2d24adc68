//! Named token buckets, one per logical operation.
//!
//! Names that were never configured are unlimited: every acquire succeeds
//! and no wait is ever required.

mod bucket;

#[cfg(test)]
mod tests;

pub use bucket::TokenBucket;

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use toolwire_types::{BucketSnapshot, ConfigError, RateLimitError, RateLimitRule};
use tracing::{debug, info};

#[derive(Debug)]
struct Limit {
    bucket: TokenBucket,
    window_secs: f64,
}

/// Registry of named token buckets.
#[derive(Debug, Default)]
pub struct RateLimiter {
    limits: DashMap<String, Arc<Limit>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a limiter with one bucket per rule.
    pub fn from_rules(rules: &[RateLimitRule]) -> Result<Self, ConfigError> {
        let limiter = Self::new();
        for rule in rules {
            limiter.configure(&rule.name, rule.max_requests, rule.window_secs)?;
        }
        Ok(limiter)
    }

    /// Allow `max_requests` per `window_secs` for `name`. Replaces any existing
    /// bucket with a full one.
    pub fn configure(&self, name: &str, max_requests: u32, window_secs: f64) -> Result<(), ConfigError> {
        if max_requests == 0 {
            return Err(ConfigError::invalid("max_requests", "must be at least 1"));
        }
        if !window_secs.is_finite() || window_secs <= 0.0 {
            return Err(ConfigError::invalid("window_secs", "must be a positive number of seconds"));
        }

        let refill_rate = f64::from(max_requests) / window_secs;
        let limit = Limit { bucket: TokenBucket::new(max_requests, refill_rate), window_secs };
        let replaced = self.limits.insert(name.to_string(), Arc::new(limit)).is_some();

        info!(
            operation = %name,
            max_requests,
            window_secs,
            refill_rate,
            replaced,
            "Rate limit configured"
        );
        Ok(())
    }

    pub fn is_configured(&self, name: &str) -> bool {
        self.limits.contains_key(name)
    }

    /// Take `n` permits from `name` without waiting.
    pub fn acquire(&self, name: &str, n: u32) -> bool {
        self.limit(name).map_or(true, |limit| limit.bucket.acquire(n))
    }

    pub fn time_until_available(&self, name: &str, n: u32) -> Duration {
        self.limit(name).map_or(Duration::ZERO, |limit| limit.bucket.time_until_available(n))
    }

    /// Take `n` permits or report how long to wait. Consumes on success.
    pub fn check_rate_limit(&self, name: &str, n: u32) -> Result<(), RateLimitError> {
        let Some(limit) = self.limit(name) else {
            return Ok(());
        };
        Self::check_capacity(name, &limit, n)?;

        if limit.bucket.acquire(n) {
            return Ok(());
        }

        let wait = limit.bucket.time_until_available(n);
        debug!(operation = %name, permits = n, retry_after_ms = wait.as_millis() as u64, "Rate limit exceeded");
        crate::metrics::record_rate_limit_rejection(name);
        Err(RateLimitError::Exceeded { name: name.to_string(), retry_after_secs: wait.as_secs_f64() })
    }

    /// Block the calling thread until `n` permits are taken from `name`.
    ///
    /// Returns the total time spent waiting.
    pub fn wait_if_needed(&self, name: &str, n: u32) -> Result<Duration, RateLimitError> {
        let Some(limit) = self.limit(name) else {
            return Ok(Duration::ZERO);
        };
        Self::check_capacity(name, &limit, n)?;

        let mut waited = Duration::ZERO;
        while !limit.bucket.acquire(n) {
            let wait = limit.bucket.time_until_available(n);
            debug!(operation = %name, permits = n, wait_ms = wait.as_millis() as u64, "Waiting for rate limit");
            std::thread::sleep(wait);
            waited += wait;
        }
        Ok(waited)
    }

    /// Async form of [`RateLimiter::wait_if_needed`]; suspends the task
    /// instead of blocking the thread.
    pub async fn wait_if_needed_async(&self, name: &str, n: u32) -> Result<Duration, RateLimitError> {
        let Some(limit) = self.limit(name) else {
            return Ok(Duration::ZERO);
        };
        Self::check_capacity(name, &limit, n)?;

        let mut waited = Duration::ZERO;
        while !limit.bucket.acquire(n) {
            let wait = limit.bucket.time_until_available(n);
            debug!(operation = %name, permits = n, wait_ms = wait.as_millis() as u64, "Waiting for rate limit");
            tokio::time::sleep(wait).await;
            waited += wait;
        }
        Ok(waited)
    }

    /// Snapshots of every configured bucket, sorted by name.
    pub fn get_all_stats(&self) -> Vec<BucketSnapshot> {
        let limits: Vec<(String, Arc<Limit>)> =
            self.limits.iter().map(|entry| (entry.key().clone(), Arc::clone(entry.value()))).collect();

        let mut stats: Vec<BucketSnapshot> = limits
            .into_iter()
            .map(|(name, limit)| BucketSnapshot {
                name,
                max_tokens: limit.bucket.max_tokens(),
                refill_rate: limit.bucket.refill_rate(),
                window_secs: limit.window_secs,
                tokens_available: limit.bucket.available(),
            })
            .collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Refill `name` to a full burst. Returns false when it is not configured.
    pub fn reset(&self, name: &str) -> bool {
        let Some(limit) = self.limit(name) else {
            return false;
        };
        let fresh = Limit {
            bucket: TokenBucket::new(limit.bucket.max_tokens(), limit.bucket.refill_rate()),
            window_secs: limit.window_secs,
        };
        self.limits.insert(name.to_string(), Arc::new(fresh));
        true
    }

    fn limit(&self, name: &str) -> Option<Arc<Limit>> {
        self.limits.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn check_capacity(name: &str, limit: &Limit, n: u32) -> Result<(), RateLimitError> {
        let capacity = limit.bucket.max_tokens();
        if n > capacity {
            return Err(RateLimitError::ExceedsCapacity { name: name.to_string(), requested: n, capacity });
        }
        Ok(())
    }
}
