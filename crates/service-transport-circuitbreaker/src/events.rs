use crate::circuit::CircuitState;
use service_transport_core::{ServiceEvent, ServiceKey};
use std::time::Instant;

/// Events emitted by the in-memory circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A key moved from one state to another.
    StateTransition {
        breaker_name: String,
        service_key: ServiceKey,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// An availability check returned `true`.
    CallPermitted {
        breaker_name: String,
        service_key: ServiceKey,
        timestamp: Instant,
        state: CircuitState,
    },
    /// An availability check returned `false`.
    CallRejected {
        breaker_name: String,
        service_key: ServiceKey,
        timestamp: Instant,
    },
    /// A success was reported for a key.
    SuccessRecorded {
        breaker_name: String,
        service_key: ServiceKey,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A failure was reported for a key.
    FailureRecorded {
        breaker_name: String,
        service_key: ServiceKey,
        timestamp: Instant,
        state: CircuitState,
    },
}

impl CircuitBreakerEvent {
    /// Name of the breaker instance that emitted the event.
    pub fn breaker_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { breaker_name, .. }
            | CircuitBreakerEvent::CallPermitted { breaker_name, .. }
            | CircuitBreakerEvent::CallRejected { breaker_name, .. }
            | CircuitBreakerEvent::SuccessRecorded { breaker_name, .. }
            | CircuitBreakerEvent::FailureRecorded { breaker_name, .. } => breaker_name,
        }
    }
}

impl ServiceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn service_key(&self) -> &ServiceKey {
        match self {
            CircuitBreakerEvent::StateTransition { service_key, .. }
            | CircuitBreakerEvent::CallPermitted { service_key, .. }
            | CircuitBreakerEvent::CallRejected { service_key, .. }
            | CircuitBreakerEvent::SuccessRecorded { service_key, .. }
            | CircuitBreakerEvent::FailureRecorded { service_key, .. } => service_key,
        }
    }
}
