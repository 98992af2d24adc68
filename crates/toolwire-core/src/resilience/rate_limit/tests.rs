use super::*;
use std::time::Instant;
use toolwire_types::ErrorKind;

#[test]
fn test_unconfigured_name_is_unlimited() {
    let limiter = RateLimiter::new();

    assert!(!limiter.is_configured("search"));
    for _ in 0..1000 {
        assert!(limiter.acquire("search", 1));
    }
    assert_eq!(limiter.time_until_available("search", 50), Duration::ZERO);
    assert!(limiter.check_rate_limit("search", 1).is_ok());
    assert_eq!(limiter.wait_if_needed("search", 1).unwrap(), Duration::ZERO);
}

#[test]
fn test_configure_derives_refill_rate() {
    let limiter = RateLimiter::new();
    limiter.configure("filings", 10, 2.0).unwrap();

    let stats = limiter.get_all_stats();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].name, "filings");
    assert_eq!(stats[0].max_tokens, 10);
    assert_eq!(stats[0].refill_rate, 5.0);
    assert_eq!(stats[0].window_secs, 2.0);
}

#[test]
fn test_configure_rejects_invalid_limits() {
    let limiter = RateLimiter::new();

    assert!(matches!(
        limiter.configure("x", 0, 1.0),
        Err(ConfigError::ValidationError { .. })
    ));
    assert!(limiter.configure("x", 1, 0.0).is_err());
    assert!(limiter.configure("x", 1, -3.0).is_err());
    assert!(limiter.configure("x", 1, f64::NAN).is_err());
    assert!(!limiter.is_configured("x"));
}

#[test]
fn test_check_rate_limit_carries_retry_after() {
    let limiter = RateLimiter::new();
    limiter.configure("quotes", 2, 60.0).unwrap();

    assert!(limiter.check_rate_limit("quotes", 2).is_ok());
    let err = limiter.check_rate_limit("quotes", 1).unwrap_err();

    match &err {
        RateLimitError::Exceeded { name, retry_after_secs } => {
            assert_eq!(name, "quotes");
            assert!(*retry_after_secs > 29.0 && *retry_after_secs <= 30.0);
        },
        RateLimitError::ExceedsCapacity { .. } => panic!("expected Exceeded, got {err:?}"),
    }
    assert_eq!(err.retry_after_secs(), Some(30));
    assert_eq!(err.clone().into_call_error("quotes").kind, ErrorKind::RateLimited);
}

#[test]
fn test_requests_above_capacity_are_rejected() {
    let limiter = RateLimiter::new();
    limiter.configure("bulk", 3, 1.0).unwrap();

    let err = limiter.wait_if_needed("bulk", 4).unwrap_err();
    assert_eq!(err, RateLimitError::ExceedsCapacity { name: "bulk".to_string(), requested: 4, capacity: 3 });
    assert!(limiter.check_rate_limit("bulk", 4).is_err());
    assert!(!limiter.acquire("bulk", 4));
}

#[test]
fn test_wait_if_needed_blocks_for_deficit() {
    let limiter = RateLimiter::new();
    limiter.configure("fast", 1, 0.05).unwrap();
    assert!(limiter.acquire("fast", 1));

    let started = Instant::now();
    let waited = limiter.wait_if_needed("fast", 1).unwrap();

    assert!(waited > Duration::ZERO);
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn test_wait_if_needed_async_suspends_for_deficit() {
    let limiter = RateLimiter::new();
    limiter.configure("fast", 2, 0.1).unwrap();
    assert!(limiter.acquire("fast", 2));

    let started = Instant::now();
    let waited = limiter.wait_if_needed_async("fast", 1).await.unwrap();

    assert!(waited > Duration::ZERO);
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_reconfigure_and_reset_refill_the_bucket() {
    let limiter = RateLimiter::new();
    limiter.configure("op", 2, 60.0).unwrap();
    assert!(limiter.acquire("op", 2));
    assert!(!limiter.acquire("op", 1));

    assert!(limiter.reset("op"));
    assert!(limiter.acquire("op", 2));

    limiter.configure("op", 5, 60.0).unwrap();
    assert!(limiter.acquire("op", 5));
    assert!(!limiter.reset("missing"));
}

#[test]
fn test_from_rules() {
    let rules = vec![
        RateLimitRule { name: "b".to_string(), max_requests: 1, window_secs: 1.0 },
        RateLimitRule { name: "a".to_string(), max_requests: 2, window_secs: 1.0 },
    ];
    let limiter = RateLimiter::from_rules(&rules).unwrap();

    let names: Vec<String> = limiter.get_all_stats().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
}
