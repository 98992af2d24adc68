use std::sync::Arc;

use toolwire_core::{RecordingSleeper, ResilienceContext};
use toolwire_types::{RateLimitRule, ResilienceConfig};

use crate::state::AppState;

pub fn test_config() -> ResilienceConfig {
    ResilienceConfig {
        rate_limits: vec![RateLimitRule {
            name: "sec_edgar".to_string(),
            max_requests: 10,
            window_secs: 1.0,
        }],
        ..ResilienceConfig::default()
    }
}

pub fn test_app_state() -> AppState {
    let ctx = ResilienceContext::with_sleeper(test_config(), Arc::new(RecordingSleeper::new()))
        .expect("test config is valid");
    AppState::new(Arc::new(ctx))
}
