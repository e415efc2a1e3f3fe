//! Circuit breaker capability for remote service calls.
//!
//! A circuit breaker is a per-service availability oracle. Before a call the
//! caller asks whether the service is available; after the call it reports
//! the outcome. Once a service has failed often enough the breaker stops
//! admitting calls for a while, so a struggling remote is not hammered and
//! callers fail fast.
//!
//! ## States
//! - **Closed**: normal operation, calls are admitted
//! - **Open**: too many failures, calls are rejected until the retry timeout elapses
//! - **Half-Open**: the retry timeout elapsed, one trial call is admitted
//!
//! Only the boolean "available" projection is part of the [`CircuitBreaker`]
//! contract. [`InMemoryCircuitBreaker`] is the in-process reference
//! implementation and additionally exposes state inspection.
//!
//! ## Usage
//!
//! ```rust
//! use service_transport_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use service_transport_core::ServiceKey;
//! use std::time::Duration;
//!
//! let breaker = CircuitBreakerConfig::builder()
//!     .name("posts-api")
//!     .max_failures(3)
//!     .retry_timeout(Duration::from_secs(5))
//!     .on_state_transition(|key, from, to| {
//!         println!("{key}: {from:?} -> {to:?}");
//!     })
//!     .build();
//!
//! let key = ServiceKey::new("http://api.myapp.com", "/posts");
//! for _ in 0..3 {
//!     breaker.report_failure(&key);
//! }
//!
//! assert!(!breaker.is_available(&key));
//! assert_eq!(breaker.state(&key), CircuitState::Open);
//! ```
//!
//! ## Metrics
//!
//! With the `metrics` feature, every series is labelled with the breaker
//! `name` only, never with the service key, so cardinality stays bounded by
//! the number of breakers:
//!
//! - `circuitbreaker_calls_total{circuitbreaker, outcome}`: `rejected`, `success`, `failure`
//! - `circuitbreaker_transitions_total{circuitbreaker, from, to}`
//! - `circuitbreaker_state{circuitbreaker, state}`: number of keys currently
//!   `Open` or `HalfOpen`. Closed keys are not counted.
//!
//! ## Feature Flags
//! - `metrics`: enables metrics collection using the `metrics` crate
//! - `tracing`: enables logging using the `tracing` crate
//! - `serde`: enables `Serialize` for `CircuitState`

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
use service_transport_core::ServiceKey;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;

pub use breaker::InMemoryCircuitBreaker;
pub use circuit::{CircuitState, ServiceSettings};
pub use config::{
    CircuitBreakerConfig, CircuitBreakerConfigBuilder, MAX_FAILURES_DEFAULT, RETRY_TIMEOUT_DEFAULT,
};
pub use error::ConfigError;
pub use events::CircuitBreakerEvent;

mod breaker;
mod circuit;
mod config;
mod error;
mod events;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
pub(crate) fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "circuitbreaker_calls_total",
            "Availability rejections and reported outcomes per breaker"
        );
        describe_counter!(
            "circuitbreaker_transitions_total",
            "Total number of circuit breaker state transitions"
        );
        describe_gauge!(
            "circuitbreaker_state",
            "Number of keys of the breaker currently open or half-open"
        );
    });
}

/// Per-service availability oracle with success/failure reporting.
///
/// Implementations own their synchronization: all methods take `&self` and
/// may be called concurrently for the same key. Reports are fire-and-forget.
pub trait CircuitBreaker: Send + Sync {
    /// Returns whether calls to `key` are currently admitted.
    fn is_available(&self, key: &ServiceKey) -> bool;

    /// Reports that a call to `key` completed successfully.
    fn report_success(&self, key: &ServiceKey);

    /// Reports that `key` could not be reached.
    fn report_failure(&self, key: &ServiceKey);
}

impl<B: CircuitBreaker + ?Sized> CircuitBreaker for Arc<B> {
    fn is_available(&self, key: &ServiceKey) -> bool {
        (**self).is_available(key)
    }

    fn report_success(&self, key: &ServiceKey) {
        (**self).report_success(key)
    }

    fn report_failure(&self, key: &ServiceKey) {
        (**self).report_failure(key)
    }
}

impl<B: CircuitBreaker + ?Sized> CircuitBreaker for Box<B> {
    fn is_available(&self, key: &ServiceKey) -> bool {
        (**self).is_available(key)
    }

    fn report_success(&self, key: &ServiceKey) {
        (**self).report_success(key)
    }

    fn report_failure(&self, key: &ServiceKey) {
        (**self).report_failure(key)
    }
}
