//! Resilient CRUD access to remote HTTP services.
//!
//! [`ServiceTransport`] composes three replaceable collaborators into a single
//! call path per operation:
//!
//! - a [`NetworkTransport`] performing the exchange ([`HttpTransport`] over
//!   reqwest, or any tower service through [`ServiceNetworkTransport`])
//! - an optional [`CircuitBreaker`] deciding whether the service is worth
//!   calling at all
//! - a [`Serializer`] turning payloads into business values
//!
//! Transport faults are translated into a small service-facing taxonomy
//! ([`ServiceError`]) that always keeps the original fault as its source.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use serde::{Deserialize, Serialize};
//! use service_transport::{
//!     HttpTransport, InMemoryCircuitBreaker, JsonSerializer, RequestArguments, ServiceTransport,
//! };
//! use std::time::Duration;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Post {
//!     id: u64,
//!     #[serde(rename = "userId")]
//!     user_id: u64,
//!     title: String,
//!     body: String,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let network = HttpTransport::builder()
//!     .base_url("https://jsonplaceholder.typicode.com")
//!     .build()?;
//!
//! let transport = ServiceTransport::builder(network)
//!     .circuit_breaker(InMemoryCircuitBreaker::new(1, Duration::from_secs(1)))
//!     .serializer(JsonSerializer::<Vec<Post>>::new())
//!     .build();
//!
//! let args = RequestArguments::new().with("userId", 1);
//! let posts = transport.retrieve("/posts", Some(&args)).await?;
//! println!("{} posts", posts.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//! - `http` (default): [`HttpTransport`] built on `reqwest`
//! - `metrics`: call outcome counters and latency histograms via the `metrics` crate
//! - `tracing`: logging via the `tracing` crate

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_histogram};
#[cfg(feature = "metrics")]
use std::sync::Once;

pub use arguments::{RequestArgument, RequestArguments};
pub use error::{
    NetworkError, NetworkFaultKind, SerializationError, SerializationFaultCategory, ServiceError,
    ServiceErrorKind,
};
pub use events::TransportEvent;
#[cfg(feature = "http")]
pub use http::{
    HttpTransport, HttpTransportBuilder, HttpTransportError, RequestSnapshot,
    CONNECT_TIMEOUT_DEFAULT, TIMEOUT_DEFAULT, TRACE_HEADER_DEFAULT,
};
pub use network::{NetworkTransport, Operation, ServiceNetworkTransport, TransportRequest};
pub use serializer::{JsonSerializer, RawSerializer, Serializer};
pub use transport::{ServiceTransport, ServiceTransportBuilder};

pub use service_transport_circuitbreaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, InMemoryCircuitBreaker,
};
pub use service_transport_core::ServiceKey;

mod arguments;
mod error;
mod events;
#[cfg(feature = "http")]
mod http;
mod network;
mod serializer;
mod transport;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
pub(crate) fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "service_transport_calls_total",
            "Calls completed by the orchestrator, by operation and outcome"
        );
        describe_histogram!(
            "service_transport_call_duration_seconds",
            metrics::Unit::Seconds,
            "Time spent in a call, breaker check and decoding included"
        );
    });
}
