//! API Routes
//!
//! Read-only resilience status plus administrative breaker resets.

pub mod resilience;


use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/resilience/health", get(resilience::get_health_report))
        .route("/resilience/circuits", get(resilience::get_circuit_status))
        .route("/resilience/circuits/:name/reset", post(resilience::reset_circuit))
        .route("/resilience/rate-limits", get(resilience::get_rate_limits))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub uptime_secs: u64,
    pub breakers: usize,
    pub rate_limits: usize,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let resilience = state.resilience();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime_secs(),
        breakers: resilience.breakers().len(),
        rate_limits: resilience.rate_limiter().get_all_stats().len(),
    })
}
