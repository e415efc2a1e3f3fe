use crate::arguments::RequestArguments;
use crate::error::{NetworkError, NetworkFaultKind, SerializationError, ServiceError, ServiceErrorKind};
use crate::events::TransportEvent;
use crate::network::{request, NetworkTransport, Operation};
use crate::serializer::{RawSerializer, Serializer};
use service_transport_circuitbreaker::CircuitBreaker;
use service_transport_core::{EventListeners, FnListener, ServiceKey};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

/// Resilient CRUD access to one remote service.
///
/// Every call computes the service key (`base_url + endpoint`), consults the
/// circuit breaker, runs the exchange through the [`NetworkTransport`], decodes
/// the payload with the [`Serializer`] and reports the outcome back to the
/// breaker. Failures are mapped as follows:
///
/// | Fault | Breaker report | Returned |
/// |---|---|---|
/// | breaker unavailable | none, network untouched | [`ServiceUnavailable`](ServiceError::ServiceUnavailable) without source |
/// | `TransportUnavailable` | failure | [`ServiceUnavailable`](ServiceError::ServiceUnavailable) |
/// | `NotFound`, `Forbidden` | none | [`ServiceLogic`](ServiceError::ServiceLogic) |
/// | payload encode/decode | none | [`UnexpectedResponse`](ServiceError::UnexpectedResponse) |
///
/// Without a breaker no translation happens: network and codec faults come
/// back as [`ServiceError::Network`] and [`ServiceError::Serialization`].
///
/// There is no retry inside a call; that is the caller's policy.
///
/// ```rust
/// use service_transport::{
///     InMemoryCircuitBreaker, JsonSerializer, NetworkError, ServiceNetworkTransport,
///     ServiceTransport, TransportRequest,
/// };
/// use std::time::Duration;
/// use tower::service_fn;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let network = ServiceNetworkTransport::new(
///     "http://api.myapp.com",
///     service_fn(|_req: TransportRequest| async {
///         Err::<String, _>(NetworkError::not_found("no such post"))
///     }),
/// );
///
/// let transport = ServiceTransport::builder(network)
///     .circuit_breaker(InMemoryCircuitBreaker::new(1, Duration::from_secs(1)))
///     .serializer(JsonSerializer::<serde_json::Value>::new())
///     .build();
///
/// let err = transport.retrieve("/posts/10", None).await.unwrap_err();
/// assert!(err.is_not_found());
/// assert_eq!(err.to_string(), "service reported an error at endpoint /posts/10");
/// # }
/// ```
pub struct ServiceTransport<N, S = RawSerializer> {
    transport: N,
    breaker: Option<Arc<dyn CircuitBreaker>>,
    serializer: S,
    event_listeners: EventListeners<TransportEvent>,
}

impl<N> ServiceTransport<N, RawSerializer> {
    /// Starts building an orchestrator over `transport`.
    ///
    /// By default there is no circuit breaker and payloads are passed through
    /// unchanged ([`RawSerializer`]).
    pub fn builder(transport: N) -> ServiceTransportBuilder<N, RawSerializer> {
        ServiceTransportBuilder::new(transport)
    }
}

impl<N, S> ServiceTransport<N, S>
where
    N: NetworkTransport,
    S: Serializer,
{
    /// Creates an orchestrator from its three collaborators.
    pub fn new(transport: N, breaker: Option<Arc<dyn CircuitBreaker>>, serializer: S) -> Self {
        #[cfg(feature = "metrics")]
        crate::describe_metrics();

        Self {
            transport,
            breaker,
            serializer,
            event_listeners: EventListeners::new(),
        }
    }

    /// The underlying network transport.
    pub fn transport(&self) -> &N {
        &self.transport
    }

    /// The payload codec.
    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Whether calls are gated by a circuit breaker.
    pub fn has_circuit_breaker(&self) -> bool {
        self.breaker.is_some()
    }

    /// The key under which availability of `endpoint` is tracked.
    pub fn service_key(&self, endpoint: &str) -> ServiceKey {
        ServiceKey::new(self.transport.base_url(), endpoint)
    }

    /// Creates a resource and returns the decoded response.
    ///
    /// A `None` payload sends no body.
    pub async fn create(
        &self,
        endpoint: &str,
        arguments: Option<&RequestArguments>,
        payload: Option<&S::Value>,
    ) -> Result<S::Value, ServiceError> {
        self.call(Operation::Create, endpoint, arguments, payload, decode)
            .await
    }

    /// Retrieves a resource and returns the decoded response.
    pub async fn retrieve(
        &self,
        endpoint: &str,
        arguments: Option<&RequestArguments>,
    ) -> Result<S::Value, ServiceError> {
        self.call(Operation::Retrieve, endpoint, arguments, None, decode)
            .await
    }

    /// Replaces a resource and returns the decoded response.
    ///
    /// A `None` payload sends no body.
    pub async fn update(
        &self,
        endpoint: &str,
        arguments: Option<&RequestArguments>,
        payload: Option<&S::Value>,
    ) -> Result<S::Value, ServiceError> {
        self.call(Operation::Update, endpoint, arguments, payload, decode)
            .await
    }

    /// Deletes a resource.
    ///
    /// A non-empty response body must still decode; an empty one is success.
    pub async fn delete(
        &self,
        endpoint: &str,
        arguments: Option<&RequestArguments>,
    ) -> Result<(), ServiceError> {
        self.call(Operation::Delete, endpoint, arguments, None, validate)
            .await
    }

    async fn call<T, D>(
        &self,
        operation: Operation,
        endpoint: &str,
        arguments: Option<&RequestArguments>,
        payload: Option<&S::Value>,
        decode: D,
    ) -> Result<T, ServiceError>
    where
        D: FnOnce(&S, &str) -> Result<T, SerializationError>,
    {
        let key = self.service_key(endpoint);
        let start = Instant::now();

        let result = match &self.breaker {
            None => {
                self.call_direct(operation, endpoint, arguments, payload, decode)
                    .await
            }
            Some(breaker) => {
                self.call_guarded(
                    breaker.as_ref(),
                    &key,
                    operation,
                    endpoint,
                    arguments,
                    payload,
                    decode,
                )
                .await
            }
        };

        self.observe(&key, operation, start.elapsed(), &result);
        result
    }

    /// Breaker disabled: faults propagate untranslated.
    async fn call_direct<T, D>(
        &self,
        operation: Operation,
        endpoint: &str,
        arguments: Option<&RequestArguments>,
        payload: Option<&S::Value>,
        decode: D,
    ) -> Result<T, ServiceError>
    where
        D: FnOnce(&S, &str) -> Result<T, SerializationError>,
    {
        let body = self.encode(operation, payload)?;
        let raw = self
            .transport
            .send(request(operation, endpoint, arguments, body))
            .await?;
        Ok(decode(&self.serializer, &raw)?)
    }

    #[allow(clippy::too_many_arguments)]
    async fn call_guarded<T, D>(
        &self,
        breaker: &dyn CircuitBreaker,
        key: &ServiceKey,
        operation: Operation,
        endpoint: &str,
        arguments: Option<&RequestArguments>,
        payload: Option<&S::Value>,
        decode: D,
    ) -> Result<T, ServiceError>
    where
        D: FnOnce(&S, &str) -> Result<T, SerializationError>,
    {
        if !breaker.is_available(key) {
            return Err(ServiceError::ServiceUnavailable {
                endpoint: endpoint.to_string(),
                source: None,
            });
        }

        // The caller's own payload is at fault; the remote was never contacted.
        let body = self
            .encode(operation, payload)
            .map_err(|source| unexpected(endpoint, source))?;

        match self
            .transport
            .send(request(operation, endpoint, arguments, body))
            .await
        {
            Ok(raw) => {
                // The remote answered, so a decode fault is not an availability problem.
                let value =
                    decode(&self.serializer, &raw).map_err(|source| unexpected(endpoint, source))?;
                breaker.report_success(key);
                Ok(value)
            }
            Err(fault) => Err(classify(breaker, key, endpoint, fault)),
        }
    }

    fn encode(
        &self,
        operation: Operation,
        payload: Option<&S::Value>,
    ) -> Result<Option<String>, SerializationError> {
        match payload {
            Some(value) if operation.has_body() => self.serializer.serialize(value).map(Some),
            _ => Ok(None),
        }
    }

    fn observe<T>(
        &self,
        key: &ServiceKey,
        operation: Operation,
        duration: Duration,
        result: &Result<T, ServiceError>,
    ) {
        let event = match result {
            Ok(_) => {
                #[cfg(feature = "tracing")]
                debug!(service = %key, %operation, ?duration, "call succeeded");

                TransportEvent::CallSucceeded {
                    service_key: key.clone(),
                    operation,
                    timestamp: Instant::now(),
                    duration,
                }
            }
            Err(err) if err.is_circuit_open() => {
                #[cfg(feature = "tracing")]
                warn!(service = %key, %operation, "call rejected, service unavailable");

                TransportEvent::CallRejected {
                    service_key: key.clone(),
                    operation,
                    timestamp: Instant::now(),
                }
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                warn!(
                    service = %key,
                    %operation,
                    error = %err,
                    cause = ?std::error::Error::source(err).map(ToString::to_string),
                    "call failed"
                );

                TransportEvent::CallFailed {
                    service_key: key.clone(),
                    operation,
                    timestamp: Instant::now(),
                    duration,
                    kind: err.kind(),
                }
            }
        };

        #[cfg(feature = "metrics")]
        {
            let outcome = match &event {
                TransportEvent::CallSucceeded { .. } => "success",
                TransportEvent::CallRejected { .. } => "rejected",
                TransportEvent::CallFailed { kind, .. } => outcome(*kind),
            };
            counter!(
                "service_transport_calls_total",
                "operation" => operation.as_str(),
                "outcome" => outcome
            )
            .increment(1);
            histogram!(
                "service_transport_call_duration_seconds",
                "operation" => operation.as_str()
            )
            .record(duration.as_secs_f64());
        }

        self.event_listeners.emit(&event);
    }
}

fn decode<S: Serializer>(serializer: &S, raw: &str) -> Result<S::Value, SerializationError> {
    serializer.deserialize(raw)
}

fn validate<S: Serializer>(serializer: &S, raw: &str) -> Result<(), SerializationError> {
    if raw.trim().is_empty() {
        return Ok(());
    }
    serializer.deserialize(raw).map(drop)
}

fn unexpected(endpoint: &str, source: SerializationError) -> ServiceError {
    ServiceError::UnexpectedResponse {
        endpoint: endpoint.to_string(),
        source,
    }
}

fn classify(
    breaker: &dyn CircuitBreaker,
    key: &ServiceKey,
    endpoint: &str,
    fault: NetworkError,
) -> ServiceError {
    match fault.kind() {
        NetworkFaultKind::TransportUnavailable => {
            breaker.report_failure(key);
            ServiceError::ServiceUnavailable {
                endpoint: endpoint.to_string(),
                source: Some(fault),
            }
        }
        NetworkFaultKind::NotFound | NetworkFaultKind::Forbidden => ServiceError::ServiceLogic {
            endpoint: endpoint.to_string(),
            source: fault,
        },
    }
}

#[cfg(feature = "metrics")]
fn outcome(kind: ServiceErrorKind) -> &'static str {
    match kind {
        ServiceErrorKind::ServiceLogic => "service_logic",
        ServiceErrorKind::ServiceUnavailable => "service_unavailable",
        ServiceErrorKind::UnexpectedResponse => "unexpected_response",
        ServiceErrorKind::Network => "network",
        ServiceErrorKind::Serialization => "serialization",
    }
}

impl<N: fmt::Debug, S: fmt::Debug> fmt::Debug for ServiceTransport<N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTransport")
            .field("transport", &self.transport)
            .field("circuit_breaker", &self.breaker.is_some())
            .field("serializer", &self.serializer)
            .field("listeners", &self.event_listeners.len())
            .finish()
    }
}

/// Builder for [`ServiceTransport`].
pub struct ServiceTransportBuilder<N, S = RawSerializer> {
    transport: N,
    breaker: Option<Arc<dyn CircuitBreaker>>,
    serializer: S,
    event_listeners: EventListeners<TransportEvent>,
}

impl<N> ServiceTransportBuilder<N, RawSerializer> {
    /// Creates a builder with no breaker and the pass-through codec.
    pub fn new(transport: N) -> Self {
        Self {
            transport,
            breaker: None,
            serializer: RawSerializer,
            event_listeners: EventListeners::new(),
        }
    }
}

impl<N, S> ServiceTransportBuilder<N, S> {
    /// Gates every call through `breaker`.
    ///
    /// Pass an `Arc` to share one breaker between several orchestrators.
    ///
    /// Default: none, faults propagate untranslated
    pub fn circuit_breaker<B>(mut self, breaker: B) -> Self
    where
        B: CircuitBreaker + 'static,
    {
        self.breaker = Some(Arc::new(breaker));
        self
    }

    /// Uses `serializer` to encode payloads and decode responses.
    ///
    /// Default: [`RawSerializer`]
    pub fn serializer<S2>(self, serializer: S2) -> ServiceTransportBuilder<N, S2>
    where
        S2: Serializer,
    {
        ServiceTransportBuilder {
            transport: self.transport,
            breaker: self.breaker,
            serializer,
            event_listeners: self.event_listeners,
        }
    }

    /// Registers a callback invoked after every successful call.
    pub fn on_call_succeeded<F>(mut self, f: F) -> Self
    where
        F: Fn(&ServiceKey, Operation, Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &TransportEvent| {
                if let TransportEvent::CallSucceeded {
                    service_key,
                    operation,
                    duration,
                    ..
                } = event
                {
                    f(service_key, *operation, *duration);
                }
            }));
        self
    }

    /// Registers a callback invoked after every failed call that reached the
    /// transport or the codec.
    pub fn on_call_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&ServiceKey, Operation, ServiceErrorKind) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &TransportEvent| {
                if let TransportEvent::CallFailed {
                    service_key,
                    operation,
                    kind,
                    ..
                } = event
                {
                    f(service_key, *operation, *kind);
                }
            }));
        self
    }

    /// Registers a callback invoked when the breaker refuses a call.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&ServiceKey, Operation) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &TransportEvent| {
                if let TransportEvent::CallRejected {
                    service_key,
                    operation,
                    ..
                } = event
                {
                    f(service_key, *operation);
                }
            }));
        self
    }
}

impl<N, S> ServiceTransportBuilder<N, S>
where
    N: NetworkTransport,
    S: Serializer,
{
    /// Builds the orchestrator.
    pub fn build(self) -> ServiceTransport<N, S> {
        let mut transport = ServiceTransport::new(self.transport, self.breaker, self.serializer);
        transport.event_listeners = self.event_listeners;
        transport
    }
}
