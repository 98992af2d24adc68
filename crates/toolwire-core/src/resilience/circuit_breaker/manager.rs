use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use toolwire_types::{BreakerConfig, BreakerSnapshot, BreakerSummary};
use tracing::{debug, info, warn};

use super::{BreakerPolicy, CircuitBreaker};

/// Registry of named breakers, one per upstream.
///
/// A breaker is created on first request and lives for the process. The
/// first registration fixes its thresholds; later requests with different
/// thresholds get the existing breaker and a warning.
#[derive(Debug)]
pub struct CircuitBreakerManager {
    defaults: BreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerManager {
    pub fn new() -> Self {
        Self::with_config(BreakerConfig::default())
    }

    pub fn with_config(defaults: BreakerConfig) -> Self {
        Self { defaults, breakers: DashMap::new() }
    }

    pub fn defaults(&self) -> &BreakerConfig {
        &self.defaults
    }

    /// Get the breaker for `name`, creating it with the given thresholds if
    /// it does not exist yet.
    pub fn get_breaker(
        &self,
        name: &str,
        failure_threshold: u32,
        timeout: Duration,
        success_threshold: u32,
    ) -> Arc<CircuitBreaker> {
        let requested = BreakerPolicy { failure_threshold, timeout, success_threshold };

        if let Some(existing) = self.breakers.get(name) {
            let existing = Arc::clone(existing.value());
            Self::warn_on_mismatch(&existing, &requested);
            return existing;
        }

        let breaker = self
            .breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(
                    breaker = %name,
                    failure_threshold,
                    timeout_secs = timeout.as_secs_f64(),
                    success_threshold,
                    "Registering circuit breaker"
                );
                Arc::new(CircuitBreaker::with_policy(name, requested))
            })
            .value()
            .clone();

        // Another caller may have won the race with different thresholds.
        Self::warn_on_mismatch(&breaker, &requested);
        breaker
    }

    /// Get or create a breaker with the manager's default thresholds.
    pub fn breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        self.get_breaker(
            name,
            self.defaults.failure_threshold,
            self.defaults.timeout(),
            self.defaults.success_threshold,
        )
    }

    /// Look up a breaker without creating it.
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshots of every registered breaker, sorted by name.
    pub fn get_all_stats(&self) -> Vec<BreakerSnapshot> {
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|entry| Arc::clone(entry.value())).collect();

        let mut stats: Vec<BreakerSnapshot> = breakers.iter().map(|b| b.get_stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    pub fn get_summary(&self) -> BreakerSummary {
        BreakerSummary::from_snapshots(&self.get_all_stats())
    }

    /// Reset one breaker. Returns false when no breaker has that name.
    pub fn reset(&self, name: &str) -> bool {
        match self.get(name) {
            Some(breaker) => {
                breaker.reset();
                true
            },
            None => false,
        }
    }

    pub fn reset_all(&self) {
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|entry| Arc::clone(entry.value())).collect();
        for breaker in &breakers {
            breaker.reset();
        }
        info!(count = breakers.len(), "All circuit breakers reset");
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    fn warn_on_mismatch(existing: &CircuitBreaker, requested: &BreakerPolicy) {
        if existing.policy() != requested {
            warn!(
                breaker = %existing.name(),
                existing_failure_threshold = existing.policy().failure_threshold,
                requested_failure_threshold = requested.failure_threshold,
                existing_timeout_secs = existing.policy().timeout.as_secs_f64(),
                requested_timeout_secs = requested.timeout.as_secs_f64(),
                "Circuit breaker already registered with different thresholds, keeping the first"
            );
        }
    }
}
