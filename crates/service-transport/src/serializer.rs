//! Payload codecs.
//!
//! A [`Serializer`] converts business values to and from the raw string the
//! network transport carries. Two codecs ship with the crate:
//!
//! - [`JsonSerializer`]: JSON through `serde_json`, for any serde type
//! - [`RawSerializer`]: identity, the payload is the raw string

use crate::error::{SerializationError, SerializationFaultCategory};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Converts business values to and from wire payloads.
pub trait Serializer: Send + Sync {
    /// The business value this codec produces and consumes.
    type Value: Send;

    /// Encodes `value` for sending.
    fn serialize(&self, value: &Self::Value) -> Result<String, SerializationError>;

    /// Decodes a received payload.
    fn deserialize(&self, raw: &str) -> Result<Self::Value, SerializationError>;
}

impl<S: Serializer + ?Sized> Serializer for std::sync::Arc<S> {
    type Value = S::Value;

    fn serialize(&self, value: &Self::Value) -> Result<String, SerializationError> {
        (**self).serialize(value)
    }

    fn deserialize(&self, raw: &str) -> Result<Self::Value, SerializationError> {
        (**self).deserialize(raw)
    }
}

/// JSON codec for any serde type.
///
/// Defaults to [`serde_json::Value`], which accepts any JSON document.
/// Decode faults carry serde_json's category and position. Encode faults are
/// always [`Io`](SerializationFaultCategory::Io) and carry no position.
///
/// ```rust
/// use serde::Deserialize;
/// use service_transport::{JsonSerializer, Serializer};
///
/// #[derive(Debug, Deserialize, serde::Serialize)]
/// struct Post {
///     id: u64,
///     title: String,
/// }
///
/// let codec = JsonSerializer::<Post>::new();
/// let post = codec.deserialize(r#"{"id":1,"title":"t"}"#).unwrap();
/// assert_eq!(post.id, 1);
///
/// let err = codec.deserialize(r#"{"id":"#).unwrap_err();
/// assert_eq!(err.line(), 1);
/// ```
pub struct JsonSerializer<T = serde_json::Value> {
    _value: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    /// Creates the codec.
    pub fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonSerializer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSerializer")
            .field("value", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Serializer for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    type Value = T;

    fn serialize(&self, value: &T) -> Result<String, SerializationError> {
        serde_json::to_string(value).map_err(encode_fault)
    }

    fn deserialize(&self, raw: &str) -> Result<T, SerializationError> {
        Ok(serde_json::from_str(raw)?)
    }
}

fn encode_fault(err: serde_json::Error) -> SerializationError {
    SerializationError::new(SerializationFaultCategory::Io, err.to_string()).with_source(err)
}

/// Identity codec: values are the raw payload strings.
///
/// Used when no codec is configured; payloads pass through untouched and
/// neither direction can fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSerializer;

impl Serializer for RawSerializer {
    type Value = String;

    fn serialize(&self, value: &String) -> Result<String, SerializationError> {
        Ok(value.clone())
    }

    fn deserialize(&self, raw: &str) -> Result<String, SerializationError> {
        Ok(raw.to_string())
    }
}
