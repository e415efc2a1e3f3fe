use crate::error::ServiceErrorKind;
use crate::network::Operation;
use service_transport_core::{ServiceEvent, ServiceKey};
use std::time::{Duration, Instant};

/// Events emitted by [`ServiceTransport`](crate::ServiceTransport), one per call.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The call completed and the response decoded.
    CallSucceeded {
        service_key: ServiceKey,
        operation: Operation,
        timestamp: Instant,
        duration: Duration,
    },
    /// The call failed after reaching the transport or the codec.
    CallFailed {
        service_key: ServiceKey,
        operation: Operation,
        timestamp: Instant,
        duration: Duration,
        kind: ServiceErrorKind,
    },
    /// The circuit breaker refused the call; the network was not touched.
    CallRejected {
        service_key: ServiceKey,
        operation: Operation,
        timestamp: Instant,
    },
}

impl TransportEvent {
    /// The operation the call performed.
    pub fn operation(&self) -> Operation {
        match self {
            TransportEvent::CallSucceeded { operation, .. }
            | TransportEvent::CallFailed { operation, .. }
            | TransportEvent::CallRejected { operation, .. } => *operation,
        }
    }
}

impl ServiceEvent for TransportEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransportEvent::CallSucceeded { .. } => "call_succeeded",
            TransportEvent::CallFailed { .. } => "call_failed",
            TransportEvent::CallRejected { .. } => "call_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TransportEvent::CallSucceeded { timestamp, .. }
            | TransportEvent::CallFailed { timestamp, .. }
            | TransportEvent::CallRejected { timestamp, .. } => *timestamp,
        }
    }

    fn service_key(&self) -> &ServiceKey {
        match self {
            TransportEvent::CallSucceeded { service_key, .. }
            | TransportEvent::CallFailed { service_key, .. }
            | TransportEvent::CallRejected { service_key, .. } => service_key,
        }
    }
}
