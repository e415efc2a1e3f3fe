//! Circuit breaker metrics regression tests

use super::helpers::*;
use serial_test::serial;
use service_transport::{CircuitBreaker, CircuitBreakerConfig, ServiceKey};
use std::time::Duration;

#[test]
#[serial]
fn circuitbreaker_metrics_exist() {
    init_recorder();

    let breaker = CircuitBreakerConfig::builder()
        .name("test_cb")
        .max_failures(2)
        .retry_timeout(Duration::from_millis(50))
        .build();
    let key = ServiceKey::new("http://api.myapp.com", "/posts");

    breaker.report_success(&key);
    breaker.report_failure(&key);
    breaker.report_failure(&key);
    assert!(!breaker.is_available(&key));

    assert_recorded("circuitbreaker_calls_total", Kind::Counter);
    for outcome in ["success", "failure", "rejected"] {
        assert_labels(
            "circuitbreaker_calls_total",
            &[("circuitbreaker", "test_cb"), ("outcome", outcome)],
        );
    }

    assert_recorded("circuitbreaker_transitions_total", Kind::Counter);
    assert_labels(
        "circuitbreaker_transitions_total",
        &[("circuitbreaker", "test_cb"), ("from", "Closed"), ("to", "Open")],
    );

    assert_recorded("circuitbreaker_state", Kind::Gauge);
    assert_labels(
        "circuitbreaker_state",
        &[("circuitbreaker", "test_cb"), ("state", "Open")],
    );
}

#[test]
#[serial]
fn circuitbreaker_state_gauge_counts_keys() {
    init_recorder();

    let breaker = CircuitBreakerConfig::builder()
        .name("gauge_cb")
        .max_failures(1)
        .retry_timeout(Duration::from_secs(60))
        .build();
    let down = ServiceKey::new("http://api.myapp.com", "/down");
    let flaky = ServiceKey::new("http://api.myapp.com", "/flaky");
    let up = ServiceKey::new("http://api.myapp.com", "/up");

    breaker.report_failure(&down);
    breaker.report_failure(&flaky);
    breaker.report_success(&up);

    let open = [("circuitbreaker", "gauge_cb"), ("state", "Open")];
    assert_eq!(gauge_value("circuitbreaker_state", &open), Some(2.0));

    breaker.reset(&flaky);
    assert_eq!(gauge_value("circuitbreaker_state", &open), Some(1.0));
    assert_eq!(
        gauge_value(
            "circuitbreaker_state",
            &[("circuitbreaker", "gauge_cb"), ("state", "Closed")]
        ),
        None
    );
}

#[test]
#[serial]
fn circuitbreaker_half_open_metrics() {
    init_recorder();

    let breaker = CircuitBreakerConfig::builder()
        .name("half_open_cb")
        .max_failures(1)
        .retry_timeout(Duration::from_millis(20))
        .build();
    let key = ServiceKey::new("http://api.myapp.com", "/comments");

    breaker.report_failure(&key);
    std::thread::sleep(Duration::from_millis(40));
    assert!(breaker.is_available(&key));
    breaker.report_success(&key);

    assert_labels(
        "circuitbreaker_transitions_total",
        &[("circuitbreaker", "half_open_cb"), ("from", "Open"), ("to", "HalfOpen")],
    );
    assert_labels(
        "circuitbreaker_transitions_total",
        &[("circuitbreaker", "half_open_cb"), ("from", "HalfOpen"), ("to", "Closed")],
    );
}
