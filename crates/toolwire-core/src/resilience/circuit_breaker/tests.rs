use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use toolwire_types::{BreakerConfig, CallError, ErrorKind};

fn failing(upstream: &str) -> Result<(), CallError> {
    Err(CallError::new(ErrorKind::Server5xx, upstream, "boom"))
}

#[test]
fn test_circuit_breaker_opens_after_failures() {
    let breaker = CircuitBreaker::new("svc", 3, Duration::from_secs(60), 2);

    for _ in 0..2 {
        let _ = breaker.call(|| failing("svc"));
    }
    assert_eq!(breaker.state(), CircuitState::Closed);

    let _ = breaker.call(|| failing("svc"));
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(breaker.get_stats().total_trips, 1);
}

#[test]
fn test_open_breaker_does_not_invoke_fn() {
    let breaker = CircuitBreaker::new("svc", 1, Duration::from_secs(60), 1);
    let _ = breaker.call(|| failing("svc"));

    let invoked = AtomicU32::new(0);
    let result: Result<(), CallError> = breaker.call(|| {
        invoked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CircuitOpen);
    assert!(err.retry_after().is_some());
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[test]
fn test_circuit_open_error_reports_remaining_time() {
    let breaker = CircuitBreaker::new("svc", 1, Duration::from_secs(60), 1);
    breaker.record_failure();

    let err = breaker.admit().unwrap_err();
    assert_eq!(err.name, "svc");
    assert!(err.retry_in <= Duration::from_secs(60));
    assert!(err.retry_in > Duration::from_secs(55));
}

#[test]
fn test_half_open_recovery() {
    let breaker = CircuitBreaker::new("svc", 2, Duration::from_millis(10), 2);
    breaker.record_failure();
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);

    std::thread::sleep(Duration::from_millis(15));

    // state() does not move the breaker; admission does.
    assert_eq!(breaker.state(), CircuitState::Open);
    let _: Result<(), CallError> = breaker.call(|| Ok(()));
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    let _: Result<(), CallError> = breaker.call(|| Ok(()));
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.get_stats().failure_count, 0);
}

#[test]
fn test_half_open_failure_reopens() {
    let breaker = CircuitBreaker::new("svc", 1, Duration::from_millis(10), 2);
    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(15));

    let _ = breaker.call(|| failing("svc"));
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(breaker.get_stats().total_trips, 2);
}

#[test]
fn test_call_with_ignores_non_breaker_failures() {
    let breaker = CircuitBreaker::new("svc", 1, Duration::from_secs(60), 1);

    let result: Result<(), CallError> = breaker.call_with(
        || Err(CallError::new(ErrorKind::Client4xx, "svc", "bad request").with_status(400)),
        |e| e.kind.trips_breaker(),
    );

    assert!(result.is_err());
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.get_stats().failure_count, 0);
}

#[test]
fn test_reset_closes_and_keeps_trip_count() {
    let breaker = CircuitBreaker::new("svc", 1, Duration::from_secs(60), 1);
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);

    breaker.reset();

    let stats = breaker.get_stats();
    assert_eq!(stats.state, CircuitState::Closed);
    assert_eq!(stats.failure_count, 0);
    assert_eq!(stats.total_trips, 1);
    assert!(stats.last_failure_time.is_none());
}

#[test]
fn test_stats_reflect_policy() {
    let breaker = CircuitBreaker::new("svc", 4, Duration::from_secs(30), 3);
    breaker.record_failure();

    let stats = breaker.get_stats();
    assert_eq!(stats.name, "svc");
    assert_eq!(stats.failure_count, 1);
    assert_eq!(stats.failure_threshold, 4);
    assert_eq!(stats.success_threshold, 3);
    assert_eq!(stats.timeout_secs, 30.0);
    assert!(stats.last_failure_time.is_some());
}

#[tokio::test]
async fn test_call_async_shares_state_with_blocking_path() {
    let breaker = Arc::new(CircuitBreaker::new("svc", 2, Duration::from_secs(60), 1));

    let _ = breaker.call(|| failing("svc"));
    let _ = breaker.call_async(|| async { failing("svc") }).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    let result: Result<u32, CallError> = breaker.call_async(|| async { Ok(1) }).await;
    assert_eq!(result.unwrap_err().kind, ErrorKind::CircuitOpen);
}

#[test]
fn test_manager_get_or_create_returns_same_instance() {
    let manager = CircuitBreakerManager::new();

    let first = manager.get_breaker("svc", 3, Duration::from_secs(10), 1);
    let second = manager.get_breaker("svc", 9, Duration::from_secs(99), 9);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.policy().failure_threshold, 3);
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_manager_default_thresholds() {
    let manager = CircuitBreakerManager::with_config(BreakerConfig {
        failure_threshold: 7,
        timeout_secs: 15,
        success_threshold: 4,
    });

    let breaker = manager.breaker("svc");
    assert_eq!(breaker.policy().failure_threshold, 7);
    assert_eq!(breaker.policy().timeout, Duration::from_secs(15));
    assert_eq!(breaker.policy().success_threshold, 4);
}

#[test]
fn test_manager_stats_and_summary() {
    let manager = CircuitBreakerManager::new();
    manager.get_breaker("zeta", 1, Duration::from_secs(60), 1).record_failure();
    manager.breaker("alpha");

    let stats = manager.get_all_stats();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].name, "alpha");
    assert_eq!(stats[1].name, "zeta");

    let summary = manager.get_summary();
    assert_eq!(summary.closed, 1);
    assert_eq!(summary.open, 1);
    assert_eq!(summary.total_trips, 1);
}

#[test]
fn test_manager_reset() {
    let manager = CircuitBreakerManager::new();
    let breaker = manager.get_breaker("svc", 1, Duration::from_secs(60), 1);
    breaker.record_failure();

    assert!(manager.reset("svc"));
    assert!(!manager.reset("unknown"));
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert!(manager.get("unknown").is_none());
}

#[test]
fn test_manager_reset_all() {
    let manager = CircuitBreakerManager::new();
    manager.get_breaker("a", 1, Duration::from_secs(60), 1).record_failure();
    manager.get_breaker("b", 1, Duration::from_secs(60), 1).record_failure();

    manager.reset_all();
    assert_eq!(manager.get_summary().open, 0);
}
