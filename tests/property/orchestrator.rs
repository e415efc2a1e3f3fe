//! Property tests for the orchestrator's breaker reporting.
//!
//! Invariants tested:
//! - Only transport-unavailable faults count as breaker failures
//! - Only decoded successes reset the count
//! - Breaker state never changes the value a successful call returns

use futures::future::BoxFuture;
use proptest::prelude::*;
use service_transport::{
    CircuitBreaker, InMemoryCircuitBreaker, NetworkError, NetworkFaultKind, NetworkTransport,
    ServiceErrorKind, ServiceKey, ServiceTransport, TransportRequest,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Ok,
    NotFound,
    Forbidden,
    Unavailable,
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Ok),
        Just(Outcome::NotFound),
        Just(Outcome::Forbidden),
        Just(Outcome::Unavailable),
    ]
}

/// Replays a scripted sequence of outcomes, one per request.
struct Scripted {
    script: Mutex<VecDeque<Outcome>>,
}

impl NetworkTransport for Scripted {
    fn base_url(&self) -> &str {
        "http://api.myapp.com"
    }

    fn send(&self, _request: TransportRequest) -> BoxFuture<'_, Result<String, NetworkError>> {
        let next = self.script.lock().unwrap().pop_front().unwrap_or(Outcome::Ok);
        let reply = match next {
            Outcome::Ok => Ok("payload".to_string()),
            Outcome::NotFound => Err(NetworkError::not_found("absent")),
            Outcome::Forbidden => Err(NetworkError::forbidden("denied")),
            Outcome::Unavailable => Err(NetworkError::unavailable("down")),
        };
        Box::pin(async move { reply })
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: the breaker's failure count tracks only unavailability
    #[test]
    fn only_unavailability_counts(outcomes in prop::collection::vec(outcome(), 0..30)) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let breaker = InMemoryCircuitBreaker::new(1_000, Duration::from_secs(60));
            let transport = ServiceTransport::builder(Scripted {
                script: Mutex::new(outcomes.iter().copied().collect()),
            })
            .circuit_breaker(breaker.clone())
            .build();
            let key = ServiceKey::new("http://api.myapp.com", "/posts");

            let mut expected = 0usize;
            for outcome in &outcomes {
                let result = transport.retrieve("/posts", None).await;
                match outcome {
                    Outcome::Ok => {
                        prop_assert_eq!(result.unwrap(), "payload");
                        expected = 0;
                    }
                    Outcome::NotFound | Outcome::Forbidden => {
                        prop_assert_eq!(result.unwrap_err().kind(), ServiceErrorKind::ServiceLogic);
                    }
                    Outcome::Unavailable => {
                        prop_assert_eq!(
                            result.unwrap_err().kind(),
                            ServiceErrorKind::ServiceUnavailable
                        );
                        expected += 1;
                    }
                }
                prop_assert_eq!(breaker.failure_count(&key), expected);
            }
            prop_assert!(breaker.is_available(&key));
            Ok(())
        })?;
    }

    /// Property: disabled mode never reclassifies a network fault
    #[test]
    fn disabled_mode_preserves_fault_kind(outcome in outcome()) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let transport = ServiceTransport::builder(Scripted {
                script: Mutex::new(VecDeque::from([outcome])),
            })
            .build();

            let result = transport.retrieve("/posts", None).await;
            let expected = match outcome {
                Outcome::Ok => None,
                Outcome::NotFound => Some(NetworkFaultKind::NotFound),
                Outcome::Forbidden => Some(NetworkFaultKind::Forbidden),
                Outcome::Unavailable => Some(NetworkFaultKind::TransportUnavailable),
            };

            match result {
                Ok(raw) => {
                    prop_assert!(expected.is_none());
                    prop_assert_eq!(raw, "payload");
                }
                Err(err) => {
                    prop_assert_eq!(err.kind(), ServiceErrorKind::Network);
                    prop_assert_eq!(err.network_fault(), expected);
                }
            }
            Ok(())
        })?;
    }
}
