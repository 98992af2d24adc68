//! Typed error definitions for Toolwire.
//!
//! All errors are designed to be:
//!
//! - **Serializable** for status APIs via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for retry and surface decisions via enum variants

mod call;
mod config;
mod rate_limit;

pub use call::{CallError, CircuitOpenError, ErrorKind};
pub use config::ConfigError;
pub use rate_limit::RateLimitError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps a classified upstream call failure
    #[error("Call error: {0}")]
    Call(#[from] CallError),

    /// Wraps a local rate-limit rejection
    #[error("Rate limit error: {0}")]
    RateLimit(#[from] RateLimitError),

    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;
