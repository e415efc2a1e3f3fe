use std::borrow::Borrow;
use std::fmt;

/// Identifies one remote service for availability tracking.
///
/// A key is the plain concatenation of a transport's base URL and an endpoint.
/// No normalisation is applied, so the same `(base_url, endpoint)` pair always
/// yields the same key and breaker state accumulates under it.
///
/// ```rust
/// use service_transport_core::ServiceKey;
///
/// let key = ServiceKey::new("http://api.myapp.com", "/posts/10");
/// assert_eq!(key.as_str(), "http://api.myapp.com/posts/10");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ServiceKey(String);

impl ServiceKey {
    /// Builds the key for `endpoint` on the service rooted at `base_url`.
    pub fn new(base_url: &str, endpoint: &str) -> Self {
        let mut key = String::with_capacity(base_url.len() + endpoint.len());
        key.push_str(base_url);
        key.push_str(endpoint);
        Self(key)
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ServiceKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for ServiceKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl AsRef<str> for ServiceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ServiceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}
