//! Core infrastructure for service-transport.
//!
//! This crate provides the pieces shared by the breaker and the orchestrator:
//! - [`ServiceKey`], the identity under which availability is tracked
//! - Event system for observability

pub mod events;
mod key;

pub use events::{EventListener, EventListeners, FnListener, ServiceEvent};
pub use key::ServiceKey;
