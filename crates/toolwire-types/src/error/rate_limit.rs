//! Local rate-limit errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CallError, ErrorKind};

/// Errors produced by the local token-bucket rate limiter.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum RateLimitError {
    /// Not enough tokens right now
    #[error("Rate limit exceeded for {name}, retry after {retry_after_secs:.3}s")]
    Exceeded {
        /// Operation name of the bucket
        name: String,
        /// Seconds until enough tokens will have refilled
        retry_after_secs: f64,
    },

    /// More permits requested than the bucket can ever hold
    #[error("Requested {requested} permits from {name}, capacity is {capacity}")]
    ExceedsCapacity {
        /// Operation name of the bucket
        name: String,
        /// Permits asked for
        requested: u32,
        /// Bucket size
        capacity: u32,
    },
}

impl RateLimitError {
    /// Whole seconds to wait before retrying, rounded up.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Exceeded { retry_after_secs, .. } => Some(retry_after_secs.max(0.0).ceil() as u64),
            Self::ExceedsCapacity { .. } => None,
        }
    }

    /// Convert into a classified error for the given upstream.
    pub fn into_call_error(self, upstream: impl Into<String>) -> CallError {
        let kind = match self {
            Self::Exceeded { .. } => ErrorKind::RateLimited,
            Self::ExceedsCapacity { .. } => ErrorKind::Internal,
        };
        let retry_after = self.retry_after_secs();
        let err = CallError::new(kind, upstream, self.to_string());
        match retry_after {
            Some(secs) => err.with_retry_after(secs),
            None => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exceeded_maps_to_rate_limited() {
        let err = RateLimitError::Exceeded { name: "search".to_string(), retry_after_secs: 0.2 };
        let call = err.into_call_error("clinicaltrials");

        assert_eq!(call.kind, ErrorKind::RateLimited);
        assert_eq!(call.retry_after_secs, Some(1));
        assert_eq!(call.upstream, "clinicaltrials");
    }

    #[test]
    fn test_capacity_maps_to_internal() {
        let err =
            RateLimitError::ExceedsCapacity { name: "search".to_string(), requested: 9, capacity: 5 };
        let call = err.into_call_error("clinicaltrials");

        assert_eq!(call.kind, ErrorKind::Internal);
        assert_eq!(call.retry_after_secs, None);
    }
}
