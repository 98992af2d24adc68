//! Resilience layer configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::error::ConfigError;

/// Full resilience configuration, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
pub struct ResilienceConfig {
    /// Thresholds applied to every per-upstream breaker
    #[serde(default)]
    #[validate(nested)]
    pub breaker: BreakerConfig,
    /// Default retry and backoff policy for outbound calls
    #[serde(default)]
    #[validate(nested)]
    pub retry: RetryConfig,
    /// HTTP client settings
    #[serde(default)]
    #[validate(nested)]
    pub http: HttpConfig,
    /// Named token buckets configured at startup
    #[serde(default)]
    #[validate(nested)]
    pub rate_limits: Vec<RateLimitRule>,
    /// Optional bound on total wall-clock time of one logical call,
    /// retries and backoff included. Unbounded when absent.
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0, max = 86_400.0))]
    pub deadline_secs: Option<f64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ResilienceConfig {
    /// Validate ranges and cross-field constraints.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::invalid("config", e.to_string()))?;

        check_seconds("http.timeout_secs", self.http.timeout_secs)?;
        check_seconds("retry.backoff_base_secs", self.retry.backoff_base_secs)?;
        check_seconds("retry.backoff_max_secs", self.retry.backoff_max_secs)?;
        if let Some(deadline) = self.deadline_secs {
            check_seconds("deadline_secs", deadline)?;
        }

        if self.retry.backoff_max_secs < self.retry.backoff_base_secs {
            return Err(ConfigError::invalid(
                "retry.backoff_max_secs",
                "must not be smaller than backoff_base_secs",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for rule in &self.rate_limits {
            if !seen.insert(rule.name.as_str()) {
                return Err(ConfigError::invalid(
                    "rate_limits",
                    format!("duplicate rate limit name: {}", rule.name),
                ));
            }
        }

        Ok(())
    }

    /// Panics on values `check()` rejects.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs_f64)
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct BreakerConfig {
    /// Consecutive failures before opening the circuit
    #[validate(range(min = 1_u32))]
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds to stay open before admitting a probe
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_breaker_timeout")]
    pub timeout_secs: u64,
    /// Consecutive half-open successes needed to close
    #[validate(range(min = 1_u32))]
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            timeout_secs: default_breaker_timeout(),
            success_threshold: default_success_threshold(),
        }
    }
}

impl BreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// NaN and infinities slip through range validation; reject anything a
/// `Duration` cannot hold.
fn check_seconds(field: &str, secs: f64) -> Result<(), ConfigError> {
    Duration::try_from_secs_f64(secs)
        .map(|_| ())
        .map_err(|e| ConfigError::invalid(field, e.to_string()))
}

/// Retry and backoff defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Configuration struct - bools are intentional retry switches"
)]
pub struct RetryConfig {
    #[validate(range(max = 20_u32))]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[validate(range(min = 0.0, max = 3_600.0))]
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: f64,
    #[validate(range(min = 0.0, max = 3_600.0))]
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: f64,
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default)]
    pub retry_on_4xx: bool,
    #[serde(default = "default_true")]
    pub retry_on_5xx: bool,
    #[serde(default = "default_true")]
    pub retry_on_network: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base(),
            backoff_max_secs: default_backoff_max(),
            backoff_multiplier: default_backoff_multiplier(),
            retry_on_4xx: false,
            retry_on_5xx: true,
            retry_on_network: true,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct HttpConfig {
    /// Per-attempt request timeout in seconds
    #[validate(range(exclusive_min = 0.0, max = 86_400.0))]
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: f64,
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Retry-After used for a 429 that carries no usable header
    #[serde(default = "default_rate_limit_retry_after")]
    pub rate_limit_retry_after_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
            rate_limit_retry_after_secs: default_rate_limit_retry_after(),
        }
    }
}

impl HttpConfig {
    /// Panics on values `ResilienceConfig::check()` rejects.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

/// A named token bucket: `max_requests` per `window_secs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct RateLimitRule {
    #[validate(length(min = 1_u64))]
    pub name: String,
    #[validate(range(min = 1_u32))]
    pub max_requests: u32,
    #[validate(range(exclusive_min = 0.0))]
    pub window_secs: f64,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily rolling log files; stdout only when absent
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), directory: None }
    }
}

pub const fn default_failure_threshold() -> u32 {
    5
}

pub const fn default_breaker_timeout() -> u64 {
    60
}

pub const fn default_success_threshold() -> u32 {
    2
}

pub const fn default_max_retries() -> u32 {
    3
}

pub const fn default_backoff_base() -> f64 {
    1.0
}

pub const fn default_backoff_max() -> f64 {
    30.0
}

pub const fn default_backoff_multiplier() -> f64 {
    2.0
}

pub const fn default_true() -> bool {
    true
}

pub const fn default_request_timeout() -> f64 {
    30.0
}

pub fn default_user_agent() -> String {
    format!("toolwire/{}", env!("CARGO_PKG_VERSION"))
}

pub const fn default_rate_limit_retry_after() -> u64 {
    60
}

pub fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ResilienceConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.timeout_secs, 60);
        assert_eq!(config.breaker.success_threshold, 2);
        assert!(config.deadline().is_none());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ResilienceConfig = serde_json::from_str(
            r#"{"retry": {"max_retries": 1}, "rate_limits": [{"name": "edgar", "max_requests": 10, "window_secs": 1.0}]}"#,
        )
        .unwrap();

        assert_eq!(config.retry.max_retries, 1);
        assert!(config.retry.retry_on_5xx);
        assert_eq!(config.http.rate_limit_retry_after_secs, 60);
        assert_eq!(config.rate_limits.len(), 1);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = ResilienceConfig::default();
        config.breaker.failure_threshold = 0;
        assert!(matches!(config.check(), Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = ResilienceConfig::default();
        config.rate_limits.push(RateLimitRule {
            name: "edgar".to_string(),
            max_requests: 10,
            window_secs: 0.0,
        });
        assert!(config.check().is_err());
    }

    #[test]
    fn test_backoff_max_below_base_rejected() {
        let mut config = ResilienceConfig::default();
        config.retry.backoff_base_secs = 10.0;
        config.retry.backoff_max_secs = 1.0;

        let err = config.check().unwrap_err();
        assert!(err.to_string().contains("backoff_max_secs"));
    }

    #[test]
    fn test_duplicate_rate_limit_names_rejected() {
        let rule =
            RateLimitRule { name: "edgar".to_string(), max_requests: 10, window_secs: 1.0 };
        let config =
            ResilienceConfig { rate_limits: vec![rule.clone(), rule], ..Default::default() };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_huge_durations_rejected() {
        let config = ResilienceConfig { deadline_secs: Some(1e20), ..Default::default() };
        assert!(matches!(config.check(), Err(ConfigError::ValidationError { .. })));

        let mut config = ResilienceConfig::default();
        config.http.timeout_secs = 1e20;
        assert!(config.check().is_err());

        let mut config = ResilienceConfig::default();
        config.retry.backoff_max_secs = 1e20;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_non_finite_durations_rejected() {
        let config = ResilienceConfig { deadline_secs: Some(f64::NAN), ..Default::default() };
        assert!(config.check().is_err());

        let mut config = ResilienceConfig::default();
        config.http.timeout_secs = f64::INFINITY;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_one_day_deadline_accepted() {
        let config = ResilienceConfig { deadline_secs: Some(86_400.0), ..Default::default() };
        assert!(config.check().is_ok());
        assert_eq!(config.deadline(), Some(Duration::from_secs(86_400)));
    }
}
