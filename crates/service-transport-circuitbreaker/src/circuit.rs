use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use service_transport_core::ServiceKey;
use std::time::{Duration, Instant};

/// State of one service key inside the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CircuitState {
    /// The key is available and calls are allowed.
    Closed,
    /// The key is unavailable; calls are rejected until the retry timeout elapses.
    Open,
    /// The retry timeout elapsed and a single trial call was let through.
    HalfOpen,
}

impl CircuitState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds applied to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Failures tolerated before the key opens.
    pub max_failures: usize,
    /// How long an opened key stays closed to traffic before a trial.
    pub retry_timeout: Duration,
}

/// Per-key breaker state.
#[derive(Debug)]
pub(crate) struct Circuit {
    state: CircuitState,
    failure_count: usize,
    // Open: when the key opened. HalfOpen: when the last trial was admitted.
    last_state_change: Instant,
    settings: Option<ServiceSettings>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_state_change: Instant::now(),
            settings: None,
        }
    }
}

impl Circuit {
    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    pub fn settings(&self, config: &CircuitBreakerConfig) -> ServiceSettings {
        self.settings.unwrap_or(ServiceSettings {
            max_failures: config.max_failures,
            retry_timeout: config.retry_timeout,
        })
    }

    pub fn set_settings(&mut self, settings: ServiceSettings) {
        self.settings = Some(settings);
    }

    pub fn try_acquire(&mut self, key: &ServiceKey, config: &CircuitBreakerConfig) -> bool {
        let retry_timeout = self.settings(config).retry_timeout;

        let permitted = match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.last_state_change.elapsed() >= retry_timeout {
                    self.transition_to(CircuitState::HalfOpen, key, config);
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                // The previous trial never reported back; admit another one
                // once a full retry timeout has passed.
                if self.last_state_change.elapsed() >= retry_timeout {
                    self.last_state_change = Instant::now();
                    true
                } else {
                    false
                }
            }
        };

        if permitted {
            config
                .event_listeners
                .emit(&CircuitBreakerEvent::CallPermitted {
                    breaker_name: config.name.clone(),
                    service_key: key.clone(),
                    timestamp: Instant::now(),
                    state: self.state,
                });
        } else {
            config
                .event_listeners
                .emit(&CircuitBreakerEvent::CallRejected {
                    breaker_name: config.name.clone(),
                    service_key: key.clone(),
                    timestamp: Instant::now(),
                });

            #[cfg(feature = "metrics")]
            counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);
        }

        permitted
    }

    pub fn record_success(&mut self, key: &ServiceKey, config: &CircuitBreakerConfig) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                breaker_name: config.name.clone(),
                service_key: key.clone(),
                timestamp: Instant::now(),
                state: self.state,
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success").increment(1);

        self.failure_count = 0;
        self.transition_to(CircuitState::Closed, key, config);
    }

    pub fn record_failure(&mut self, key: &ServiceKey, config: &CircuitBreakerConfig) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                breaker_name: config.name.clone(),
                service_key: key.clone(),
                timestamp: Instant::now(),
                state: self.state,
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure").increment(1);

        match self.state {
            // Late reports from calls admitted before the key opened.
            CircuitState::Open => {}
            CircuitState::HalfOpen => {
                self.failure_count += 1;
                self.transition_to(CircuitState::Open, key, config);
            }
            CircuitState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= self.settings(config).max_failures {
                    self.transition_to(CircuitState::Open, key, config);
                }
            }
        }
    }

    pub fn force_open(&mut self, key: &ServiceKey, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Open, key, config);
        // Restart the timer even if the key was already open.
        self.last_state_change = Instant::now();
    }

    pub fn reset(&mut self, key: &ServiceKey, config: &CircuitBreakerConfig) {
        self.failure_count = 0;
        self.transition_to(CircuitState::Closed, key, config);
    }

    fn transition_to(&mut self, state: CircuitState, key: &ServiceKey, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                breaker_name: config.name.clone(),
                service_key: key.clone(),
                timestamp: Instant::now(),
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(
            breaker = %config.name,
            service = %key,
            from = ?from_state,
            to = ?state,
            failures = self.failure_count,
            "Circuit state transition"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);

            // Every key starts closed, so only the other states are counted.
            if state != CircuitState::Closed {
                gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone(), "state" => state.as_str())
                    .increment(1.0);
            }
            if from_state != CircuitState::Closed {
                gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone(), "state" => from_state.as_str())
                    .decrement(1.0);
            }
        }

        self.state = state;
        self.last_state_change = Instant::now();
    }
}
