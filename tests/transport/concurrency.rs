use super::{MockNetwork, key};
use service_transport::{
    CircuitBreakerConfig, CircuitState, JsonSerializer, NetworkError, ServiceTransport,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 100 concurrent calls against a healthy service all succeed and all report.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_healthy_service() {
    let successes = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&successes);
    let breaker = CircuitBreakerConfig::builder()
        .max_failures(5)
        .name("healthy")
        .on_success(move |_, _| {
            s.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let transport = Arc::new(
        ServiceTransport::builder(MockNetwork::replying(r#"{"ok":true}"#))
            .circuit_breaker(breaker.clone())
            .serializer(JsonSerializer::<serde_json::Value>::new())
            .build(),
    );

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { transport.retrieve("/posts", None).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(successes.load(Ordering::SeqCst), 100);
    assert_eq!(transport.transport().calls(), 100);
    assert_eq!(breaker.state(&key("/posts")), CircuitState::Closed);
}

/// Concurrent failures open the key exactly once and later calls short-circuit.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_open_once() {
    let opened = Arc::new(AtomicUsize::new(0));
    let o = Arc::clone(&opened);
    let breaker = CircuitBreakerConfig::builder()
        .max_failures(10)
        .retry_timeout(Duration::from_secs(60))
        .on_state_transition(move |_, _, to| {
            if to == CircuitState::Open {
                o.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();

    let transport = Arc::new(
        ServiceTransport::builder(MockNetwork::new(|_| {
            Err(NetworkError::unavailable("connection refused"))
        }))
        .circuit_breaker(breaker.clone())
        .build(),
    );

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { transport.retrieve("/posts", None).await })
        })
        .collect();

    let mut rejected = 0;
    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        if err.is_circuit_open() {
            rejected += 1;
        }
    }

    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(breaker.state(&key("/posts")), CircuitState::Open);
    assert_eq!(transport.transport().calls() + rejected, 50);
    assert!(transport.transport().calls() >= 10);

    let err = transport.retrieve("/posts", None).await.unwrap_err();
    assert!(err.is_circuit_open());
}
