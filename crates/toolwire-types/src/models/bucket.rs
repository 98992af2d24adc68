//! Token bucket snapshots.

use serde::{Deserialize, Serialize};

/// Read-only copy of one configured rate limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSnapshot {
    /// Operation name
    pub name: String,
    pub max_tokens: u32,
    /// Tokens added per second
    pub refill_rate: f64,
    pub window_secs: f64,
    /// Tokens available at snapshot time, after refill
    pub tokens_available: f64,
}
