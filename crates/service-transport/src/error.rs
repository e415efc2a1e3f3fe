//! Error taxonomy.
//!
//! Three levels, from lowest to highest:
//!
//! | Level | Type | Raised by |
//! |---|---|---|
//! | Network | [`NetworkError`] tagged with a [`NetworkFaultKind`] | network transports |
//! | Serialization | [`SerializationError`] | serializers |
//! | Service | [`ServiceError`] | [`ServiceTransport`](crate::ServiceTransport) |
//!
//! Every service-level error keeps the lower-level fault as its
//! [`source`](std::error::Error::source), so callers can still tell a
//! not-found from a forbidden underneath a [`ServiceError::ServiceLogic`].

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Classification of a failed network exchange.
///
/// Exhaustive and mutually exclusive: a transport assigns exactly one kind
/// to every failure it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkFaultKind {
    /// The remote explicitly reported the resource as absent.
    NotFound,
    /// The remote explicitly refused the request: authorization (401, 403) or
    /// any other client-side rejection such as 400 or 422.
    Forbidden,
    /// Connection failure, timeout, 5xx, 408, 429, or any fault not
    /// attributable to the specific request.
    TransportUnavailable,
}

impl NetworkFaultKind {
    /// HTTP status conventionally associated with this kind, if any.
    pub fn status_code(self) -> Option<u16> {
        match self {
            NetworkFaultKind::NotFound => Some(404),
            NetworkFaultKind::Forbidden => Some(403),
            NetworkFaultKind::TransportUnavailable => None,
        }
    }

    /// Whether this fault means the remote could not be reached.
    pub fn is_unavailable(self) -> bool {
        self == NetworkFaultKind::TransportUnavailable
    }
}

impl fmt::Display for NetworkFaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFaultKind::NotFound => f.write_str("not found"),
            NetworkFaultKind::Forbidden => f.write_str("forbidden"),
            NetworkFaultKind::TransportUnavailable => f.write_str("transport unavailable"),
        }
    }
}

/// A failed network exchange, tagged with its [`NetworkFaultKind`].
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct NetworkError {
    kind: NetworkFaultKind,
    message: String,
    status: Option<u16>,
    #[source]
    source: Option<BoxError>,
}

impl NetworkError {
    /// Creates an error of the given kind.
    pub fn new(kind: NetworkFaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: kind.status_code(),
            source: None,
        }
    }

    /// The remote reported the resource as absent.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(NetworkFaultKind::NotFound, message)
    }

    /// The remote refused authorization.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(NetworkFaultKind::Forbidden, message)
    }

    /// The remote could not be reached or failed in a way unrelated to the resource.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(NetworkFaultKind::TransportUnavailable, message)
    }

    /// Classifies a non-success HTTP status.
    ///
    /// | Status | Kind |
    /// |---|---|
    /// | 404, 410 | [`NotFound`](NetworkFaultKind::NotFound) |
    /// | 401, 403, other 4xx | [`Forbidden`](NetworkFaultKind::Forbidden) |
    /// | 408, 429, 5xx, anything else | [`TransportUnavailable`](NetworkFaultKind::TransportUnavailable) |
    ///
    /// A client-side rejection means the remote answered, so it must not count
    /// against the breaker. 408 and 429 are the remote shedding load.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            404 | 410 => NetworkFaultKind::NotFound,
            408 | 429 => NetworkFaultKind::TransportUnavailable,
            400..=499 => NetworkFaultKind::Forbidden,
            _ => NetworkFaultKind::TransportUnavailable,
        };
        Self {
            kind,
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The fault classification.
    pub fn kind(&self) -> NetworkFaultKind {
        self.kind
    }

    /// The human-readable description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The HTTP status that produced this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

/// Category of a serialization fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationFaultCategory {
    /// The input is not syntactically valid.
    Syntax,
    /// The input is valid but does not match the expected shape.
    Data,
    /// The input ended unexpectedly.
    Eof,
    /// The value could not be encoded, or an I/O error occurred.
    Io,
}

impl fmt::Display for SerializationFaultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationFaultCategory::Syntax => f.write_str("syntax error"),
            SerializationFaultCategory::Data => f.write_str("data error"),
            SerializationFaultCategory::Eof => f.write_str("unexpected end of input"),
            SerializationFaultCategory::Io => f.write_str("encoding error"),
        }
    }
}

/// A payload could not be encoded or decoded.
#[derive(Debug, Error)]
pub struct SerializationError {
    category: SerializationFaultCategory,
    message: String,
    line: usize,
    column: usize,
    #[source]
    source: Option<BoxError>,
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}: {}", self.category, self.message)
        } else {
            write!(
                f,
                "{} at line {}, column {}: {}",
                self.category, self.line, self.column, self.message
            )
        }
    }
}

impl SerializationError {
    /// Creates a fault without position information.
    pub fn new(category: SerializationFaultCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            line: 0,
            column: 0,
            source: None,
        }
    }

    /// Records where in the input the fault was detected (1-based).
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The kind of fault.
    pub fn category(&self) -> SerializationFaultCategory {
        self.category
    }

    /// The codec's diagnostic.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Line of the fault, or 0 when unknown.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Column of the fault, or 0 when unknown.
    pub fn column(&self) -> usize {
        self.column
    }
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        let category = match err.classify() {
            Category::Syntax => SerializationFaultCategory::Syntax,
            Category::Data => SerializationFaultCategory::Data,
            Category::Eof => SerializationFaultCategory::Eof,
            Category::Io => SerializationFaultCategory::Io,
        };
        let (line, column) = (err.line(), err.column());
        let mut message = err.to_string();
        // serde_json appends " at line L column C"; the position is kept in
        // dedicated fields instead.
        if let Some(idx) = message.rfind(" at line ") {
            message.truncate(idx);
        }

        Self::new(category, message).at(line, column).with_source(err)
    }
}

/// Service-facing error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    /// The service was reachable but rejected the request.
    ServiceLogic,
    /// The service is unreachable or its breaker is open; do not retry yet.
    ServiceUnavailable,
    /// The payload did not match the codec.
    UnexpectedResponse,
    /// A network fault propagated as-is because no breaker is configured.
    Network,
    /// A codec fault propagated as-is because no breaker is configured.
    Serialization,
}

/// Errors returned by [`ServiceTransport`](crate::ServiceTransport).
///
/// With a circuit breaker configured, only the first three variants occur.
/// Without one, network and serialization faults propagate unchanged as
/// [`ServiceError::Network`] and [`ServiceError::Serialization`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The remote responded but refused the specific request (not found or
    /// forbidden). The original [`NetworkError`] is the source.
    #[error("service reported an error at endpoint {endpoint}")]
    ServiceLogic {
        endpoint: String,
        #[source]
        source: NetworkError,
    },

    /// The remote could not be reached, or the breaker reports it unavailable.
    ///
    /// `source` is `None` when the breaker short-circuited the call.
    #[error("unreachable service at endpoint {endpoint}")]
    ServiceUnavailable {
        endpoint: String,
        #[source]
        source: Option<NetworkError>,
    },

    /// The payload could not be encoded or the response could not be decoded.
    #[error("bad response from endpoint {endpoint}")]
    UnexpectedResponse {
        endpoint: String,
        #[source]
        source: SerializationError,
    },

    /// Network fault propagated untranslated (no breaker configured).
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Codec fault propagated untranslated (no breaker configured).
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl ServiceError {
    /// Returns the service-facing kind of this error.
    pub fn kind(&self) -> ServiceErrorKind {
        match self {
            ServiceError::ServiceLogic { .. } => ServiceErrorKind::ServiceLogic,
            ServiceError::ServiceUnavailable { .. } => ServiceErrorKind::ServiceUnavailable,
            ServiceError::UnexpectedResponse { .. } => ServiceErrorKind::UnexpectedResponse,
            ServiceError::Network(_) => ServiceErrorKind::Network,
            ServiceError::Serialization(_) => ServiceErrorKind::Serialization,
        }
    }

    /// The endpoint the failed call targeted, when known.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ServiceError::ServiceLogic { endpoint, .. }
            | ServiceError::ServiceUnavailable { endpoint, .. }
            | ServiceError::UnexpectedResponse { endpoint, .. } => Some(endpoint),
            ServiceError::Network(_) | ServiceError::Serialization(_) => None,
        }
    }

    /// The underlying network fault, if this error wraps one.
    pub fn network_error(&self) -> Option<&NetworkError> {
        match self {
            ServiceError::ServiceLogic { source, .. } | ServiceError::Network(source) => {
                Some(source)
            }
            ServiceError::ServiceUnavailable { source, .. } => source.as_ref(),
            _ => None,
        }
    }

    /// The kind of the underlying network fault, if any.
    pub fn network_fault(&self) -> Option<NetworkFaultKind> {
        self.network_error().map(NetworkError::kind)
    }

    /// The underlying serialization fault, if this error wraps one.
    pub fn serialization_error(&self) -> Option<&SerializationError> {
        match self {
            ServiceError::UnexpectedResponse { source, .. } | ServiceError::Serialization(source) => {
                Some(source)
            }
            _ => None,
        }
    }

    /// Whether the breaker rejected the call without touching the network.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ServiceError::ServiceUnavailable { source: None, .. })
    }

    /// Whether the remote reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        self.network_fault() == Some(NetworkFaultKind::NotFound)
    }

    /// Whether the remote refused the request.
    pub fn is_forbidden(&self) -> bool {
        self.network_fault() == Some(NetworkFaultKind::Forbidden)
    }
}
