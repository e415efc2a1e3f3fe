//! HTTP network transport over `reqwest`.

use crate::error::{BoxError, NetworkError};
use crate::network::{NetworkTransport, Operation, TransportRequest};
use futures::future::BoxFuture;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
#[cfg(feature = "tracing")]
use tracing::debug;

/// Default connect timeout.
pub const CONNECT_TIMEOUT_DEFAULT: Duration = Duration::from_secs(10);

/// Default whole-request timeout.
pub const TIMEOUT_DEFAULT: Duration = Duration::from_secs(10);

/// Header carrying the caller's trace id.
pub const TRACE_HEADER_DEFAULT: &str = "X-DGT-TRACE";

/// Errors raised while building an [`HttpTransport`].
#[derive(Debug, Error)]
pub enum HttpTransportError {
    /// No base URL was configured.
    #[error("base URL is required")]
    MissingBaseUrl,

    /// The base URL does not parse.
    #[error("invalid base URL {url:?}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The trace header name or value is not a valid HTTP header.
    #[error("invalid trace header {name:?}")]
    InvalidTraceHeader {
        name: String,
        #[source]
        source: BoxError,
    },

    /// The underlying client could not be created.
    #[error("failed to build HTTP client")]
    Client(#[from] reqwest::Error),
}

/// What the transport last put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    /// HTTP method.
    pub method: String,
    /// Full URL, query string included.
    pub url: String,
    /// Request headers, in insertion order.
    pub headers: Vec<(String, String)>,
    /// Raw body, if one was sent.
    pub body: Option<String>,
}

/// [`NetworkTransport`] speaking HTTP through a shared [`reqwest::Client`].
///
/// Operations map to `POST`/`GET`/`PUT`/`DELETE`. The request URL is the base
/// URL followed by the endpoint, with the arguments appended as the query
/// string in order. Responses are classified as follows:
///
/// | Outcome | Result |
/// |---|---|
/// | 2xx | body text |
/// | 404 | [`NotFound`](crate::NetworkFaultKind::NotFound) |
/// | 403 | [`Forbidden`](crate::NetworkFaultKind::Forbidden) |
/// | other status, connect error, timeout, unreadable body | [`TransportUnavailable`](crate::NetworkFaultKind::TransportUnavailable) |
///
/// ```rust,no_run
/// use service_transport::{HttpTransport, NetworkTransport};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = HttpTransport::builder()
///     .base_url("https://jsonplaceholder.typicode.com")
///     .timeout(Duration::from_secs(3))
///     .trace_id("8a1f-42")
///     .build()?;
///
/// let raw = transport.retrieve("/posts/1", None).await?;
/// println!("{raw}");
/// # Ok(())
/// # }
/// ```
pub struct HttpTransport {
    base_url: String,
    client: Client,
    trace_header: Option<(HeaderName, HeaderValue)>,
    last_request: Mutex<Option<RequestSnapshot>>,
}

impl HttpTransport {
    /// Starts building a transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    /// Returns the request most recently sent, if any.
    pub fn last_request(&self) -> Option<RequestSnapshot> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn prepare(&self, request: &TransportRequest) -> Result<reqwest::Request, NetworkError> {
        let target = format!("{}{}", self.base_url, request.endpoint);
        let url = Url::parse(&target).map_err(|e| {
            NetworkError::unavailable(format!("invalid request URL {target}")).with_source(e)
        })?;

        let method = match request.operation {
            Operation::Create => Method::POST,
            Operation::Retrieve => Method::GET,
            Operation::Update => Method::PUT,
            Operation::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, url);
        if !request.arguments.is_empty() {
            builder = builder.query(&request.arguments.as_query());
        }
        if let Some((name, value)) = &self.trace_header {
            builder = builder.header(name.clone(), value.clone());
        }
        if request.operation.has_body() {
            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }
        }

        builder.build().map_err(|e| {
            NetworkError::unavailable(format!("could not build request for {target}")).with_source(e)
        })
    }

    fn record(&self, request: &reqwest::Request, body: Option<String>) {
        let snapshot = RequestSnapshot {
            method: request.method().to_string(),
            url: request.url().to_string(),
            headers: request
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body,
        };
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("trace_header", &self.trace_header)
            .finish_non_exhaustive()
    }
}

impl NetworkTransport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<String, NetworkError>> {
        Box::pin(async move {
            let prepared = self.prepare(&request)?;
            let sent_body = if request.operation.has_body() {
                request.body
            } else {
                None
            };
            self.record(&prepared, sent_body);

            let method = prepared.method().clone();
            let url = prepared.url().clone();

            #[cfg(feature = "tracing")]
            debug!(%method, %url, "sending request");

            let response = self.client.execute(prepared).await.map_err(|e| {
                let reason = if e.is_timeout() {
                    "timed out"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "request failed"
                };
                NetworkError::unavailable(format!("{method} {url} {reason}")).with_source(e)
            })?;

            let status = response.status();

            #[cfg(feature = "tracing")]
            debug!(%method, %url, status = status.as_u16(), "response received");

            if !status.is_success() {
                return Err(NetworkError::from_status(
                    status.as_u16(),
                    format!("{method} {url} returned {status}"),
                ));
            }

            response.text().await.map_err(|e| {
                NetworkError::unavailable(format!("{method} {url} body could not be read"))
                    .with_source(e)
            })
        })
    }
}

/// Builder for [`HttpTransport`].
///
/// Defaults: 10 s connect timeout, 10 s request timeout, no trace header.
pub struct HttpTransportBuilder {
    base_url: Option<String>,
    connect_timeout: Duration,
    timeout: Duration,
    trace_header_name: String,
    trace_id: Option<String>,
    client: Option<Client>,
}

impl HttpTransportBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            connect_timeout: CONNECT_TIMEOUT_DEFAULT,
            timeout: TIMEOUT_DEFAULT,
            trace_header_name: TRACE_HEADER_DEFAULT.to_string(),
            trace_id: None,
            client: None,
        }
    }

    /// Sets the base URL every endpoint is appended to. Required.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the connect timeout.
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the whole-request timeout.
    ///
    /// Default: 10 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Forwards `value` in the [`TRACE_HEADER_DEFAULT`] header on every request.
    pub fn trace_id(mut self, value: impl Into<String>) -> Self {
        self.trace_id = Some(value.into());
        self
    }

    /// Forwards `value` in the `name` header on every request.
    pub fn trace_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.trace_header_name = name.into();
        self.trace_id = Some(value.into());
        self
    }

    /// Uses a preconfigured client. The timeouts set on this builder are then
    /// ignored in favour of the client's own.
    ///
    /// A client built without a timeout can wait on a stalled remote forever,
    /// and such a call never surfaces as
    /// [`TransportUnavailable`](crate::NetworkFaultKind::TransportUnavailable).
    /// Configure at least [`reqwest::ClientBuilder::timeout`] on it.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the transport.
    pub fn build(self) -> Result<HttpTransport, HttpTransportError> {
        let base_url = self.base_url.ok_or(HttpTransportError::MissingBaseUrl)?;
        if let Err(e) = Url::parse(&base_url) {
            return Err(HttpTransportError::InvalidBaseUrl {
                url: base_url,
                source: Box::new(e),
            });
        }

        let trace_header = match self.trace_id {
            Some(value) => {
                let name = HeaderName::from_bytes(self.trace_header_name.as_bytes()).map_err(|e| {
                    HttpTransportError::InvalidTraceHeader {
                        name: self.trace_header_name.clone(),
                        source: Box::new(e),
                    }
                })?;
                let value = HeaderValue::from_str(&value).map_err(|e| {
                    HttpTransportError::InvalidTraceHeader {
                        name: self.trace_header_name.clone(),
                        source: Box::new(e),
                    }
                })?;
                Some((name, value))
            }
            None => None,
        };

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .connect_timeout(self.connect_timeout)
                .timeout(self.timeout)
                .build()?,
        };

        Ok(HttpTransport {
            base_url,
            client,
            trace_header,
            last_request: Mutex::new(None),
        })
    }
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
