//! Prometheus metrics for upstream calls and resilience state.
//!
//! Exposes:
//! - `toolwire_upstream_calls_total{upstream,outcome}` - Counter of logical calls by final outcome
//! - `toolwire_upstream_call_duration_seconds{upstream}` - Histogram of logical call durations
//! - `toolwire_upstream_retries_total{upstream}` - Counter of retry attempts
//! - `toolwire_breaker_transitions_total{breaker,to}` - Counter of circuit breaker state changes
//! - `toolwire_rate_limit_rejections_total{name}` - Counter of local rate limit rejections
//! - `toolwire_uptime_seconds` - Gauge of process uptime
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use toolwire_types::CircuitState;

use crate::error::{AppError, AppResult};

static PROMETHEUS_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

static METRICS_START_TIME: OnceLock<Instant> = OnceLock::new();

/// Buckets covering fast cached lookups up to calls that spent their full
/// retry budget.
const CALL_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Install the Prometheus recorder. Safe to call more than once; later calls
/// return the existing handle.
pub fn init_metrics() -> AppResult<PrometheusHandle> {
    let _ = METRICS_START_TIME.get_or_init(Instant::now);

    let mut slot = PROMETHEUS_HANDLE.lock();
    if let Some(handle) = slot.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(CALL_LATENCY_BUCKETS)
        .map_err(|e| AppError::Telemetry(format!("Failed to set histogram buckets: {e}")))?
        .install_recorder()
        .map_err(|e| AppError::Telemetry(format!("Failed to install Prometheus recorder: {e}")))?;

    describe_counter!("toolwire_upstream_calls_total", "Logical upstream calls by final outcome");
    describe_histogram!(
        "toolwire_upstream_call_duration_seconds",
        "Wall-clock duration of logical upstream calls, retries included"
    );
    describe_counter!("toolwire_upstream_retries_total", "Retry attempts against upstreams");
    describe_counter!("toolwire_breaker_transitions_total", "Circuit breaker state transitions");
    describe_counter!("toolwire_rate_limit_rejections_total", "Local rate limit rejections");
    describe_gauge!("toolwire_uptime_seconds", "Process uptime in seconds");

    *slot = Some(handle.clone());
    Ok(handle)
}

/// Record a finished logical call. `outcome` is `success` or an error kind.
pub fn record_call(upstream: &str, outcome: &str, duration: Duration) {
    counter!(
        "toolwire_upstream_calls_total",
        "upstream" => upstream.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("toolwire_upstream_call_duration_seconds", "upstream" => upstream.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_retry(upstream: &str) {
    counter!("toolwire_upstream_retries_total", "upstream" => upstream.to_string()).increment(1);
}

pub fn record_breaker_transition(breaker: &str, to: CircuitState) {
    counter!(
        "toolwire_breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
}

pub fn record_rate_limit_rejection(name: &str) {
    counter!("toolwire_rate_limit_rejections_total", "name" => name.to_string()).increment(1);
}

fn update_uptime_gauge() {
    if let Some(start) = METRICS_START_TIME.get() {
        gauge!("toolwire_uptime_seconds").set(start.elapsed().as_secs_f64());
    }
}

/// Render all metrics in Prometheus text format.
pub fn render_metrics() -> String {
    update_uptime_gauge();

    let handle = PROMETHEUS_HANDLE.lock().clone();
    match handle {
        Some(handle) => handle.render(),
        None => String::from("# Metrics not initialized\n"),
    }
}
