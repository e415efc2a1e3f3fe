//! Property tests for the in-memory circuit breaker.
//!
//! Invariants tested:
//! - Opens exactly when the failure count reaches `max_failures`
//! - Availability checks without reports never change state
//! - A success always closes the key and clears its count
//! - Keys never influence each other

use proptest::prelude::*;
use service_transport::{CircuitBreaker, CircuitState, InMemoryCircuitBreaker, ServiceKey};
use std::time::Duration;

fn key(endpoint: &str) -> ServiceKey {
    ServiceKey::new("http://api.myapp.com", endpoint)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the key opens once failures reach the threshold, never before
    #[test]
    fn opens_at_threshold(max_failures in 1usize..=30, failures in 0usize..=60) {
        let breaker = InMemoryCircuitBreaker::new(max_failures, Duration::from_secs(60));
        let k = key("/posts");

        for _ in 0..failures {
            breaker.report_failure(&k);
        }

        let expected = if failures >= max_failures {
            CircuitState::Open
        } else {
            CircuitState::Closed
        };
        prop_assert_eq!(breaker.state(&k), expected);
        prop_assert_eq!(breaker.failure_count(&k), failures.min(max_failures));
        prop_assert_eq!(breaker.is_available(&k), failures < max_failures);
    }

    /// Property: repeated availability checks are idempotent
    #[test]
    fn availability_checks_are_idempotent(
        max_failures in 1usize..=10,
        failures in 0usize..=20,
        checks in 1usize..=20,
    ) {
        let breaker = InMemoryCircuitBreaker::new(max_failures, Duration::from_secs(60));
        let k = key("/posts");
        for _ in 0..failures {
            breaker.report_failure(&k);
        }

        let state = breaker.state(&k);
        let count = breaker.failure_count(&k);
        let first = breaker.is_available(&k);

        for _ in 0..checks {
            prop_assert_eq!(breaker.is_available(&k), first);
        }
        prop_assert_eq!(breaker.state(&k), state);
        prop_assert_eq!(breaker.failure_count(&k), count);
    }

    /// Property: a success resets the key whatever happened before
    #[test]
    fn success_always_resets(
        max_failures in 1usize..=10,
        reports in prop::collection::vec(any::<bool>(), 0..40),
    ) {
        let breaker = InMemoryCircuitBreaker::new(max_failures, Duration::from_secs(60));
        let k = key("/posts");
        for success in reports {
            if success {
                breaker.report_success(&k);
            } else {
                breaker.report_failure(&k);
            }
        }

        breaker.report_success(&k);

        prop_assert_eq!(breaker.state(&k), CircuitState::Closed);
        prop_assert_eq!(breaker.failure_count(&k), 0);
        prop_assert!(breaker.is_available(&k));
    }

    /// Property: the failure count follows a consecutive-failure model until the key opens
    #[test]
    fn failure_count_matches_model(
        max_failures in 1usize..=8,
        reports in prop::collection::vec(any::<bool>(), 0..40),
    ) {
        let breaker = InMemoryCircuitBreaker::new(max_failures, Duration::from_secs(60));
        let k = key("/posts");
        let mut count = 0usize;

        for success in reports {
            if success {
                breaker.report_success(&k);
                count = 0;
            } else {
                breaker.report_failure(&k);
                if count < max_failures {
                    count += 1;
                }
            }
            prop_assert_eq!(breaker.failure_count(&k), count);
            prop_assert_eq!(breaker.state(&k) == CircuitState::Open, count >= max_failures);
        }
    }

    /// Property: reports on one key leave every other key closed
    #[test]
    fn keys_are_isolated(
        failures in 1usize..=20,
        other in "/[a-z]{1,8}",
    ) {
        prop_assume!(other != "/posts");
        let breaker = InMemoryCircuitBreaker::new(1, Duration::from_secs(60));

        for _ in 0..failures {
            breaker.report_failure(&key("/posts"));
        }

        prop_assert!(!breaker.is_available(&key("/posts")));
        prop_assert!(breaker.is_available(&key(&other)));
        prop_assert_eq!(breaker.failure_count(&key(&other)), 0);
    }

    /// Property: service keys are the plain concatenation of base URL and endpoint
    #[test]
    fn service_key_is_concatenation(base in "https?://[a-z]{1,10}\\.com", endpoint in "/[a-z0-9/]{0,12}") {
        let k = ServiceKey::new(&base, &endpoint);
        prop_assert_eq!(k.as_str(), format!("{base}{endpoint}"));
        prop_assert_eq!(k, ServiceKey::new(&base, &endpoint));
    }
}
