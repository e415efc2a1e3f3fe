use crate::breaker::InMemoryCircuitBreaker;
use crate::circuit::CircuitState;
use crate::error::ConfigError;
use crate::events::CircuitBreakerEvent;
use service_transport_core::{EventListeners, FnListener, ServiceKey};
use std::time::Duration;

/// Failures tolerated per key before it opens, unless configured otherwise.
pub const MAX_FAILURES_DEFAULT: usize = 20;

/// Time an opened key stays closed to traffic, unless configured otherwise.
pub const RETRY_TIMEOUT_DEFAULT: Duration = Duration::from_secs(5);

/// Configuration for the in-memory circuit breaker.
pub struct CircuitBreakerConfig {
    pub(crate) max_failures: usize,
    pub(crate) retry_timeout: Duration,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Failures tolerated per key before it opens.
    pub fn max_failures(&self) -> usize {
        self.max_failures
    }

    /// Time an opened key stays closed to traffic before a trial call.
    pub fn retry_timeout(&self) -> Duration {
        self.retry_timeout
    }

    /// Name used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("max_failures", &self.max_failures)
            .field("retry_timeout", &self.retry_timeout)
            .field("name", &self.name)
            .field("listeners", &self.event_listeners.len())
            .finish()
    }
}

/// Builder for configuring and constructing an [`InMemoryCircuitBreaker`].
///
/// Event callbacks run while the breaker holds its internal lock; they must
/// not call back into the same breaker.
pub struct CircuitBreakerConfigBuilder {
    max_failures: usize,
    retry_timeout: Duration,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_failures: MAX_FAILURES_DEFAULT,
            retry_timeout: RETRY_TIMEOUT_DEFAULT,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets how many failures a key tolerates before it opens.
    ///
    /// Default: 20
    pub fn max_failures(mut self, n: usize) -> Self {
        self.max_failures = n;
        self
    }

    /// Sets how long an opened key rejects calls before a trial is let through.
    ///
    /// Default: 5 seconds
    pub fn retry_timeout(mut self, duration: Duration) -> Self {
        self.retry_timeout = duration;
        self
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback invoked when a key changes state.
    ///
    /// # Example
    /// ```rust
    /// use service_transport_circuitbreaker::{CircuitBreakerConfig, CircuitState};
    ///
    /// let breaker = CircuitBreakerConfig::builder()
    ///     .max_failures(1)
    ///     .on_state_transition(|key, from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("{key} is unavailable ({from:?} -> {to:?})");
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(&ServiceKey, CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    service_key,
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(service_key, *from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback invoked when an availability check admits a call.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(&ServiceKey, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted {
                    service_key, state, ..
                } = event
                {
                    f(service_key, *state);
                }
            }));
        self
    }

    /// Registers a callback invoked when an availability check rejects a call.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&ServiceKey) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallRejected { service_key, .. } = event {
                    f(service_key);
                }
            }));
        self
    }

    /// Registers a callback invoked when a success is reported.
    ///
    /// The state passed is the one the key was in before the report.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&ServiceKey, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded {
                    service_key, state, ..
                } = event
                {
                    f(service_key, *state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a failure is reported.
    ///
    /// The state passed is the one the key was in before the report.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&ServiceKey, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded {
                    service_key, state, ..
                } = event
                {
                    f(service_key, *state);
                }
            }));
        self
    }

    /// Validates the configuration and builds the breaker.
    pub fn try_build(self) -> Result<InMemoryCircuitBreaker, ConfigError> {
        validate(self.max_failures, self.retry_timeout)?;

        let config = CircuitBreakerConfig {
            max_failures: self.max_failures,
            retry_timeout: self.retry_timeout,
            event_listeners: self.event_listeners,
            name: self.name,
        };

        Ok(InMemoryCircuitBreaker::from_config(config))
    }

    /// Builds the breaker.
    ///
    /// # Panics
    ///
    /// Panics if `max_failures` is zero or `retry_timeout` is zero. Use
    /// [`try_build`](Self::try_build) to handle invalid configuration.
    pub fn build(self) -> InMemoryCircuitBreaker {
        match self.try_build() {
            Ok(breaker) => breaker,
            Err(err) => panic!("invalid circuit breaker configuration: {err}"),
        }
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn validate(max_failures: usize, retry_timeout: Duration) -> Result<(), ConfigError> {
    if max_failures == 0 {
        return Err(ConfigError::ZeroMaxFailures);
    }
    if retry_timeout.is_zero() {
        return Err(ConfigError::ZeroRetryTimeout);
    }
    Ok(())
}
