//! Domain models: status snapshots and configuration.

mod breaker;
mod bucket;
pub mod config;
mod health;

pub use breaker::{BreakerSnapshot, BreakerSummary, CircuitState};
pub use bucket::BucketSnapshot;
pub use config::{
    BreakerConfig, HttpConfig, LoggingConfig, RateLimitRule, ResilienceConfig, RetryConfig,
};
pub use health::{HealthReport, HealthStatus};
