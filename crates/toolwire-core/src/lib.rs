//! # Toolwire Core
//!
//! The resilient-call layer shared by every tool server.
//!
//! ## Architecture
//!
//! ```text
//! toolwire-core/src/
//! ├── resilience/          # ResilienceContext, built once at startup
//! │   ├── circuit_breaker/ # per-upstream state machine + registry
//! │   ├── rate_limit/      # token buckets + named registry
//! │   ├── sleeper.rs       # backoff sleep seam (real / recording)
//! │   └── health.rs        # breaker states → healthy/degraded/unhealthy
//! ├── upstream/            # CallOptions, classification, retry, ResilientClient
//! ├── modules/             # config file loading, logging setup
//! └── metrics.rs           # Prometheus counters for calls, retries, breakers
//! ```
//!
//! Tool-layer code builds a [`CallOptions`] and hands it to
//! [`ResilientClient::call`] (blocking threads) or
//! [`ResilientClient::call_async`] (tokio tasks). Both paths share breaker and
//! bucket state and one classification function.

#![allow(
    clippy::significant_drop_tightening,
    reason = "Mutex guards are scoped to bookkeeping blocks by construction"
)]
#![cfg_attr(test, allow(clippy::panic, clippy::float_cmp, clippy::unwrap_used))]

pub mod error;
pub mod metrics;
pub mod modules;
pub mod resilience;
pub mod upstream;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerManager};
pub use resilience::rate_limit::{RateLimiter, TokenBucket};
pub use resilience::sleeper::{RealSleeper, RecordingSleeper, Sleeper};
pub use resilience::ResilienceContext;
pub use upstream::{CallOptions, ResilientClient, UpstreamResponse};
