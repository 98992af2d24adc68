use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use toolwire_types::{BreakerSnapshot, BreakerSummary, BucketSnapshot, HealthReport, HealthStatus};

use crate::state::AppState;

/// Aggregate health; answers 503 when every upstream is failing fast.
pub async fn get_health_report(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.resilience().health();
    let code = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report))
}

#[derive(Serialize)]
pub struct CircuitStatusResponse {
    pub summary: BreakerSummary,
    pub circuits: Vec<BreakerSnapshot>,
}

pub async fn get_circuit_status(State(state): State<AppState>) -> Json<CircuitStatusResponse> {
    let circuits = state.resilience().breakers().get_all_stats();
    let summary = BreakerSummary::from_snapshots(&circuits);
    Json(CircuitStatusResponse { summary, circuits })
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub name: String,
    pub reset: bool,
}

pub async fn reset_circuit(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> (StatusCode, Json<ResetResponse>) {
    let reset = state.resilience().breakers().reset(&name);
    let code = if reset { StatusCode::OK } else { StatusCode::NOT_FOUND };
    (code, Json(ResetResponse { name, reset }))
}

pub async fn get_rate_limits(State(state): State<AppState>) -> Json<Vec<BucketSnapshot>> {
    Json(state.resilience().rate_limiter().get_all_stats())
}

pub async fn get_metrics() -> Response {
    let metrics = toolwire_core::metrics::render_metrics();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")], metrics).into_response()
}
