//! Network transport boundary.
//!
//! A [`NetworkTransport`] performs one request/response exchange for an
//! [`Operation`] and classifies every failure as a [`NetworkError`]. The
//! orchestrator only relies on this contract; [`HttpTransport`] is the
//! reqwest-backed implementation and [`ServiceNetworkTransport`] lifts any
//! tower service into a transport.
//!
//! [`HttpTransport`]: crate::HttpTransport

use crate::arguments::RequestArguments;
use crate::error::NetworkError;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tower::{Service, ServiceExt};

/// The four CRUD operations a transport can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a resource (POST).
    Create,
    /// Read a resource (GET).
    Retrieve,
    /// Replace a resource (PUT).
    Update,
    /// Remove a resource (DELETE).
    Delete,
}

impl Operation {
    /// Whether this operation sends a payload.
    pub fn has_body(self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }

    /// The HTTP method conventionally used for this operation.
    pub fn http_method(self) -> &'static str {
        match self {
            Operation::Create => "POST",
            Operation::Retrieve => "GET",
            Operation::Update => "PUT",
            Operation::Delete => "DELETE",
        }
    }

    /// Lowercase operation name, as used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Retrieve => "retrieve",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exchange handed to a [`NetworkTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// What to do.
    pub operation: Operation,
    /// Path relative to the transport's base URL.
    pub endpoint: String,
    /// Query arguments, in order.
    pub arguments: RequestArguments,
    /// Serialized payload; only meaningful for with-body operations.
    pub body: Option<String>,
}

impl TransportRequest {
    /// Creates a request without arguments or body.
    pub fn new(operation: Operation, endpoint: impl Into<String>) -> Self {
        Self {
            operation,
            endpoint: endpoint.into(),
            arguments: RequestArguments::new(),
            body: None,
        }
    }

    /// Sets the query arguments.
    pub fn with_arguments(mut self, arguments: RequestArguments) -> Self {
        self.arguments = arguments;
        self
    }

    /// Sets the raw payload.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

pub(crate) fn request(
    operation: Operation,
    endpoint: &str,
    arguments: Option<&RequestArguments>,
    body: Option<String>,
) -> TransportRequest {
    TransportRequest {
        operation,
        endpoint: endpoint.to_string(),
        arguments: arguments.cloned().unwrap_or_default(),
        body,
    }
}

/// Performs raw request/response exchanges against one remote service.
///
/// Implementations must classify every failure into exactly one
/// [`NetworkFaultKind`](crate::NetworkFaultKind). Timeouts and cancellation
/// belong here too and surface as
/// [`TransportUnavailable`](crate::NetworkFaultKind::TransportUnavailable).
pub trait NetworkTransport: Send + Sync {
    /// Base URL the endpoints are relative to. Part of every service key.
    fn base_url(&self) -> &str;

    /// Performs the exchange and returns the raw response payload.
    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<String, NetworkError>>;

    /// Sends a [`Create`](Operation::Create) request.
    fn create(
        &self,
        endpoint: &str,
        arguments: Option<&RequestArguments>,
        body: Option<String>,
    ) -> BoxFuture<'_, Result<String, NetworkError>> {
        self.send(request(Operation::Create, endpoint, arguments, body))
    }

    /// Sends a [`Retrieve`](Operation::Retrieve) request.
    fn retrieve(
        &self,
        endpoint: &str,
        arguments: Option<&RequestArguments>,
    ) -> BoxFuture<'_, Result<String, NetworkError>> {
        self.send(request(Operation::Retrieve, endpoint, arguments, None))
    }

    /// Sends an [`Update`](Operation::Update) request.
    fn update(
        &self,
        endpoint: &str,
        arguments: Option<&RequestArguments>,
        body: Option<String>,
    ) -> BoxFuture<'_, Result<String, NetworkError>> {
        self.send(request(Operation::Update, endpoint, arguments, body))
    }

    /// Sends a [`Delete`](Operation::Delete) request.
    fn delete(
        &self,
        endpoint: &str,
        arguments: Option<&RequestArguments>,
    ) -> BoxFuture<'_, Result<String, NetworkError>> {
        self.send(request(Operation::Delete, endpoint, arguments, None))
    }
}

impl<T: NetworkTransport + ?Sized> NetworkTransport for &T {
    fn base_url(&self) -> &str {
        (**self).base_url()
    }

    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<String, NetworkError>> {
        (**self).send(request)
    }
}

impl<T: NetworkTransport + ?Sized> NetworkTransport for Arc<T> {
    fn base_url(&self) -> &str {
        (**self).base_url()
    }

    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<String, NetworkError>> {
        (**self).send(request)
    }
}

impl<T: NetworkTransport + ?Sized> NetworkTransport for Box<T> {
    fn base_url(&self) -> &str {
        (**self).base_url()
    }

    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<String, NetworkError>> {
        (**self).send(request)
    }
}

/// Adapts a tower [`Service`] into a [`NetworkTransport`].
///
/// Each request is sent on a clone of the inner service, so middleware such
/// as timeouts or rate limits can be layered at the transport boundary.
///
/// ```rust
/// use service_transport::{NetworkTransport, ServiceNetworkTransport, TransportRequest};
/// use service_transport::NetworkError;
/// use tower::service_fn;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let transport = ServiceNetworkTransport::new(
///     "http://api.myapp.com",
///     service_fn(|req: TransportRequest| async move {
///         Ok::<_, NetworkError>(format!("{} {}", req.operation.http_method(), req.endpoint))
///     }),
/// );
///
/// let raw = transport.retrieve("/posts/1", None).await.unwrap();
/// assert_eq!(raw, "GET /posts/1");
/// # }
/// ```
#[derive(Clone)]
pub struct ServiceNetworkTransport<S> {
    base_url: String,
    service: S,
}

impl<S> ServiceNetworkTransport<S> {
    /// Wraps `service`, reporting `base_url` as the transport's base URL.
    pub fn new(base_url: impl Into<String>, service: S) -> Self {
        Self {
            base_url: base_url.into(),
            service,
        }
    }

    /// Returns the wrapped service.
    pub fn get_ref(&self) -> &S {
        &self.service
    }
}

impl<S> fmt::Debug for ServiceNetworkTransport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceNetworkTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl<S> NetworkTransport for ServiceNetworkTransport<S>
where
    S: Service<TransportRequest, Response = String, Error = NetworkError>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<String, NetworkError>> {
        let service = self.service.clone();
        Box::pin(service.oneshot(request))
    }
}
