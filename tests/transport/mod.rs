//! Orchestrator tests.
//!
//! Test organization:
//! - operations.rs: the four operations with and without a breaker
//! - error_mapping.rs: fault classification and breaker reporting
//! - scenarios.rs: end-to-end flows against the in-memory breaker
//! - http.rs: the reqwest transport against a local mock backend
//! - concurrency.rs: shared orchestrators under concurrent load

mod concurrency;
mod error_mapping;

use futures::future::BoxFuture;
use service_transport::{
    CircuitBreaker, NetworkError, NetworkFaultKind, NetworkTransport, ServiceKey,
    TransportRequest,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) const BASE_URL: &str = "http://api.myapp.com";

type Responder = Box<dyn Fn(&TransportRequest) -> Result<String, NetworkError> + Send + Sync>;

/// Network double that answers through a closure and records every request.
pub(crate) struct MockNetwork {
    respond: Responder,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockNetwork {
    pub(crate) fn new<F>(respond: F) -> Self
    where
        F: Fn(&TransportRequest) -> Result<String, NetworkError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `raw`.
    pub(crate) fn replying(raw: &'static str) -> Self {
        Self::new(move |_| Ok(raw.to_string()))
    }

    /// Always fails with `kind`.
    pub(crate) fn failing(kind: NetworkFaultKind) -> Self {
        Self::new(move |req| Err(NetworkError::new(kind, format!("{} refused", req.endpoint))))
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl NetworkTransport for MockNetwork {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<String, NetworkError>> {
        let reply = (self.respond)(&request);
        self.requests.lock().unwrap().push(request);
        Box::pin(async move {
            tokio::task::yield_now().await;
            reply
        })
    }
}

/// Breaker double counting every interaction per call kind.
#[derive(Default)]
pub(crate) struct RecordingBreaker {
    pub(crate) unavailable: bool,
    checks: AtomicUsize,
    successes: Mutex<Vec<ServiceKey>>,
    failures: Mutex<Vec<ServiceKey>>,
}

impl RecordingBreaker {
    pub(crate) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub(crate) fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub(crate) fn successes(&self) -> Vec<ServiceKey> {
        self.successes.lock().unwrap().clone()
    }

    pub(crate) fn failures(&self) -> Vec<ServiceKey> {
        self.failures.lock().unwrap().clone()
    }
}

impl CircuitBreaker for RecordingBreaker {
    fn is_available(&self, _key: &ServiceKey) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        !self.unavailable
    }

    fn report_success(&self, key: &ServiceKey) {
        self.successes.lock().unwrap().push(key.clone());
    }

    fn report_failure(&self, key: &ServiceKey) {
        self.failures.lock().unwrap().push(key.clone());
    }
}

pub(crate) fn key(endpoint: &str) -> ServiceKey {
    ServiceKey::new(BASE_URL, endpoint)
}
