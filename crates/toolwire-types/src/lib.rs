//! # Toolwire Types
//!
//! Error taxonomy, status snapshots and configuration models shared by the
//! Toolwire crates.
//!
//! - **`error`** - Classified call errors, rate-limit errors, configuration errors
//! - **`models`** - Breaker/bucket snapshots, health reports, `ResilienceConfig`
//!
//! ## Architecture Role
//!
//! `toolwire-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!        toolwire-types (this crate)
//!                │
//!                ▼
//!          toolwire-core
//!                │
//!                ▼
//!         toolwire-server
//! ```
//!
//! Everything here is plain data: serializable via serde, cheap to clone, and
//! comparable for tests.

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{
    CallError, CircuitOpenError, ConfigError, ErrorKind, RateLimitError, Result, TypedError,
};

// Re-export core model types
pub use models::{
    BreakerConfig, BreakerSnapshot, BreakerSummary, BucketSnapshot, CircuitState, HealthReport,
    HealthStatus, HttpConfig, LoggingConfig, RateLimitRule, ResilienceConfig, RetryConfig,
};
