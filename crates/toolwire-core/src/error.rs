//! Unified error types for Toolwire Core.

use serde::Serialize;
use thiserror::Error;
use toolwire_types::{CallError, ConfigError, RateLimitError};

/// Main error type for non-call operations (startup, config, logging).
///
/// Outbound calls never surface this type; they return [`CallError`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Network client construction failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A classified upstream call failed.
    #[error("Call error: {0}")]
    Call(#[from] CallError),

    /// Local rate limiter rejected an operation.
    #[error("Rate limit exceeded: {0}")]
    RateLimit(#[from] RateLimitError),

    /// Logging or metrics recorder could not be installed.
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for Toolwire operations.
pub type AppResult<T> = Result<T, AppError>;
