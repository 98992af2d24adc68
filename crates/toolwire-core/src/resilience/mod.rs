//! Shared resilience state, built once at startup and passed to every call
//! site by `Arc`.

pub mod circuit_breaker;
pub mod health;
pub mod rate_limit;
pub mod sleeper;

use std::sync::Arc;
use toolwire_types::{ConfigError, HealthReport, ResilienceConfig};
use tracing::info;

use circuit_breaker::{CircuitBreaker, CircuitBreakerManager};
use rate_limit::RateLimiter;
use sleeper::{RealSleeper, Sleeper};

/// Breaker registry, rate limiter, configuration and backoff sleeper for
/// one process.
#[derive(Debug)]
pub struct ResilienceContext {
    config: ResilienceConfig,
    breakers: CircuitBreakerManager,
    rate_limiter: RateLimiter,
    sleeper: Arc<dyn Sleeper>,
}

impl ResilienceContext {
    /// Validate `config` and configure its rate limits.
    pub fn new(config: ResilienceConfig) -> Result<Self, ConfigError> {
        Self::with_sleeper(config, Arc::new(RealSleeper))
    }

    pub fn with_sleeper(config: ResilienceConfig, sleeper: Arc<dyn Sleeper>) -> Result<Self, ConfigError> {
        config.check()?;
        let rate_limiter = RateLimiter::from_rules(&config.rate_limits)?;
        let breakers = CircuitBreakerManager::with_config(config.breaker.clone());

        info!(
            failure_threshold = config.breaker.failure_threshold,
            breaker_timeout_secs = config.breaker.timeout_secs,
            success_threshold = config.breaker.success_threshold,
            max_retries = config.retry.max_retries,
            rate_limits = config.rate_limits.len(),
            "Resilience context ready"
        );

        Ok(Self { config, breakers, rate_limiter, sleeper })
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    pub fn breakers(&self) -> &CircuitBreakerManager {
        &self.breakers
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    /// Breaker for `upstream` with the configured thresholds.
    pub fn breaker_for(&self, upstream: &str) -> Arc<CircuitBreaker> {
        self.breakers.breaker(upstream)
    }

    pub fn health(&self) -> HealthReport {
        health::evaluate(self.breakers.get_all_stats(), self.rate_limiter.get_all_stats())
    }
}
