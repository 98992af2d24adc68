//! Aggregate health of the resilience layer.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{BreakerSnapshot, BucketSnapshot};

/// Overall status derived from breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Every breaker is closed
    Healthy,
    /// Some breakers are open or probing, others serve
    Degraded,
    /// Every known upstream is failing fast
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Response structure for the health endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub open_breakers: Vec<String>,
    pub half_open_breakers: Vec<String>,
    pub breakers: Vec<BreakerSnapshot>,
    pub rate_limits: Vec<BucketSnapshot>,
}
