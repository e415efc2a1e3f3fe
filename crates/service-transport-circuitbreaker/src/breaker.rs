use crate::circuit::{Circuit, CircuitState, ServiceSettings};
use crate::config::{validate, CircuitBreakerConfig, MAX_FAILURES_DEFAULT, RETRY_TIMEOUT_DEFAULT};
use crate::error::ConfigError;
use crate::CircuitBreaker;
use service_transport_core::ServiceKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
#[cfg(feature = "tracing")]
use tracing::debug;

/// In-process circuit breaker keeping one circuit per [`ServiceKey`].
///
/// Every key starts closed. Failures are counted per key; once a key has
/// failed `max_failures` times it opens and rejects calls for
/// `retry_timeout`. After that a single trial call is admitted. A success
/// closes the key again, a failure re-opens it.
///
/// Clones share state, so a single breaker can be handed to several
/// orchestrators.
///
/// ```rust
/// use service_transport_circuitbreaker::{CircuitBreaker, InMemoryCircuitBreaker};
/// use service_transport_core::ServiceKey;
/// use std::time::Duration;
///
/// let breaker = InMemoryCircuitBreaker::new(1, Duration::from_secs(1));
/// let key = ServiceKey::new("http://api.myapp.com", "/posts");
///
/// assert!(breaker.is_available(&key));
/// breaker.report_failure(&key);
/// assert!(!breaker.is_available(&key));
/// ```
#[derive(Clone)]
pub struct InMemoryCircuitBreaker {
    circuits: Arc<Mutex<HashMap<ServiceKey, Circuit>>>,
    config: Arc<CircuitBreakerConfig>,
}

impl InMemoryCircuitBreaker {
    /// Creates a breaker with the given thresholds and no listeners.
    ///
    /// # Panics
    ///
    /// Panics if either threshold is zero.
    pub fn new(max_failures: usize, retry_timeout: Duration) -> Self {
        CircuitBreakerConfig::builder()
            .max_failures(max_failures)
            .retry_timeout(retry_timeout)
            .build()
    }

    pub(crate) fn from_config(config: CircuitBreakerConfig) -> Self {
        #[cfg(feature = "metrics")]
        crate::describe_metrics();

        Self {
            circuits: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    /// Returns the breaker configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Overrides the thresholds for a single key.
    ///
    /// Other keys keep the breaker-wide defaults.
    pub fn set_service_settings(
        &self,
        key: &ServiceKey,
        max_failures: usize,
        retry_timeout: Duration,
    ) -> Result<(), ConfigError> {
        validate(max_failures, retry_timeout)?;

        let mut circuits = self.lock();
        circuits.entry(key.clone()).or_default().set_settings(ServiceSettings {
            max_failures,
            retry_timeout,
        });
        Ok(())
    }

    /// Returns the thresholds in effect for `key`.
    pub fn service_settings(&self, key: &ServiceKey) -> ServiceSettings {
        let circuits = self.lock();
        match circuits.get(key) {
            Some(circuit) => circuit.settings(&self.config),
            None => ServiceSettings {
                max_failures: self.config.max_failures,
                retry_timeout: self.config.retry_timeout,
            },
        }
    }

    /// Returns the current state of `key`. Unknown keys are closed.
    pub fn state(&self, key: &ServiceKey) -> CircuitState {
        self.lock()
            .get(key)
            .map(Circuit::state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Returns the failures counted for `key` since its last success.
    pub fn failure_count(&self, key: &ServiceKey) -> usize {
        self.lock().get(key).map(Circuit::failure_count).unwrap_or(0)
    }

    /// Opens `key` immediately and restarts its retry timer.
    pub fn force_open(&self, key: &ServiceKey) {
        let mut circuits = self.lock();
        circuits
            .entry(key.clone())
            .or_default()
            .force_open(key, &self.config);
    }

    /// Closes `key` and clears its failure count. Per-key settings are kept.
    pub fn reset(&self, key: &ServiceKey) {
        let mut circuits = self.lock();
        if let Some(circuit) = circuits.get_mut(key) {
            circuit.reset(key, &self.config);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ServiceKey, Circuit>> {
        // Circuit updates never leave the map half-written, so a poisoned
        // lock still guards consistent data.
        self.circuits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryCircuitBreaker {
    fn default() -> Self {
        Self::new(MAX_FAILURES_DEFAULT, RETRY_TIMEOUT_DEFAULT)
    }
}

impl std::fmt::Debug for InMemoryCircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCircuitBreaker")
            .field("config", &self.config)
            .field("keys", &self.lock().len())
            .finish()
    }
}

impl CircuitBreaker for InMemoryCircuitBreaker {
    fn is_available(&self, key: &ServiceKey) -> bool {
        let mut circuits = self.lock();

        // Unknown keys are closed; avoid allocating an entry just to say so.
        let available = match circuits.get_mut(key) {
            Some(circuit) => circuit.try_acquire(key, &self.config),
            None => Circuit::default().try_acquire(key, &self.config),
        };

        #[cfg(feature = "tracing")]
        debug!(breaker = %self.config.name, service = %key, available, "availability check");

        available
    }

    fn report_success(&self, key: &ServiceKey) {
        let mut circuits = self.lock();
        match circuits.get_mut(key) {
            Some(circuit) => circuit.record_success(key, &self.config),
            // Nothing to reset on a key that never failed.
            None => Circuit::default().record_success(key, &self.config),
        }
    }

    fn report_failure(&self, key: &ServiceKey) {
        let mut circuits = self.lock();
        circuits
            .entry(key.clone())
            .or_default()
            .record_failure(key, &self.config);
    }
}
