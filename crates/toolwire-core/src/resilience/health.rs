//! Aggregate health derived from breaker states.

use toolwire_types::{BreakerSnapshot, BucketSnapshot, CircuitState, HealthReport, HealthStatus};

/// Build a report from breaker and bucket snapshots.
///
/// No breakers, or all closed: healthy. Every breaker open: unhealthy.
/// Anything in between: degraded.
pub fn evaluate(breakers: Vec<BreakerSnapshot>, rate_limits: Vec<BucketSnapshot>) -> HealthReport {
    let names_in = |state: CircuitState| -> Vec<String> {
        breakers.iter().filter(|b| b.state == state).map(|b| b.name.clone()).collect()
    };
    let open_breakers = names_in(CircuitState::Open);
    let half_open_breakers = names_in(CircuitState::HalfOpen);

    let status = if open_breakers.is_empty() && half_open_breakers.is_empty() {
        HealthStatus::Healthy
    } else if open_breakers.len() == breakers.len() {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Degraded
    };

    HealthReport { status, open_breakers, half_open_breakers, breakers, rate_limits }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str, state: CircuitState) -> BreakerSnapshot {
        BreakerSnapshot {
            name: name.to_string(),
            state,
            failure_count: 0,
            success_count: 0,
            failure_threshold: 5,
            success_threshold: 2,
            timeout_secs: 60.0,
            last_failure_time: None,
            total_trips: 0,
        }
    }

    #[test]
    fn test_no_breakers_is_healthy() {
        assert_eq!(evaluate(vec![], vec![]).status, HealthStatus::Healthy);
    }

    #[test]
    fn test_all_closed_is_healthy() {
        let report = evaluate(
            vec![snapshot("sec", CircuitState::Closed), snapshot("fred", CircuitState::Closed)],
            vec![],
        );
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.open_breakers.is_empty());
    }

    #[test]
    fn test_some_open_is_degraded() {
        let report = evaluate(
            vec![
                snapshot("sec", CircuitState::Open),
                snapshot("fred", CircuitState::Closed),
                snapshot("zillow", CircuitState::HalfOpen),
            ],
            vec![],
        );
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.open_breakers, vec!["sec".to_string()]);
        assert_eq!(report.half_open_breakers, vec!["zillow".to_string()]);
    }

    #[test]
    fn test_only_half_open_is_degraded() {
        let report = evaluate(vec![snapshot("sec", CircuitState::HalfOpen)], vec![]);
        assert_eq!(report.status, HealthStatus::Degraded);
    }

    #[test]
    fn test_all_open_is_unhealthy() {
        let report = evaluate(
            vec![snapshot("sec", CircuitState::Open), snapshot("fred", CircuitState::Open)],
            vec![],
        );
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }
}
