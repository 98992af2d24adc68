//! Outbound calls through the resilience layer.
//!
//! One logical call: resolve the upstream name, optionally draw a rate-limit
//! permit, run the attempt through that upstream's breaker, classify the
//! outcome, then retry with jittered exponential backoff or return.

pub mod classify;
mod client;
pub mod naming;
mod options;
pub mod retry;
mod response;

pub use client::ResilientClient;
pub use options::{is_idempotent, CallOptions};
pub use response::UpstreamResponse;
