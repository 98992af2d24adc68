//! Application State
//!
//! Shared state for the status server: the process-wide resilience context.

use std::sync::Arc;
use std::time::Instant;

use toolwire_core::ResilienceContext;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub resilience: Arc<ResilienceContext>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(resilience: Arc<ResilienceContext>) -> Self {
        Self { inner: Arc::new(AppStateInner { resilience, started_at: Instant::now() }) }
    }

    pub fn resilience(&self) -> &ResilienceContext {
        &self.inner.resilience
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
