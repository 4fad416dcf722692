//! Response body union.
use bytes::Bytes;
use futures_core::Stream;
use serde::Serialize;
use serde_json::Value;
use std::{fmt, io, pin::Pin};

/// A lazy byte source, drained by the host transport.
pub type BoxByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>;

/// The value assigned as a response body.
///
/// The classification drives Content-Type inference and Content-Length
/// bookkeeping in the response view; it is re-derived on every assignment.
#[derive(Default)]
pub enum Body {
    /// No body. Terminal for content headers.
    #[default]
    Empty,
    /// A character string, sent verbatim as UTF-8.
    Text(String),
    /// A raw byte buffer.
    Binary(Bytes),
    /// A lazy byte source with no length known a priori.
    Stream(BoxByteStream),
    /// An arbitrary serializable value, rendered as JSON downstream.
    Structured(Value),
}

impl Body {
    /// Wrap a byte stream.
    pub fn stream(stream: impl Stream<Item = io::Result<Bytes>> + Send + 'static) -> Self {
        Self::Stream(Box::pin(stream))
    }

    /// Erase a serializable value into a structured body.
    pub fn json<T: Serialize>(value: T) -> Result<Self, serde_json::Error> {
        Ok(Self::Structured(serde_json::to_value(value)?))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Byte length, when known without draining or serializing.
    pub fn len(&self) -> Option<u64> {
        match self {
            Self::Text(s) => Some(s.len() as u64),
            Self::Binary(b) => Some(b.len() as u64),
            Self::Empty | Self::Stream(_) | Self::Structured(_) => None,
        }
    }

    /// Materialize the body for flushing.
    ///
    /// Structured values are serialized as JSON here; streams return `None`
    /// and must be drained by the transport instead.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::Empty | Self::Stream(_) => None,
            Self::Text(s) => Some(Bytes::from(s)),
            Self::Binary(b) => Some(b),
            Self::Structured(v) => Some(Bytes::from(serde_json::to_vec(&v).unwrap_or_default())),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Binary(b) => f.debug_tuple("Binary").field(&b.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
            Self::Structured(v) => f.debug_tuple("Structured").field(v).finish(),
        }
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Self::Binary(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(value))
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

impl<T> From<Option<T>> for Body
where
    T: Into<Body>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Self::Empty,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_lengths() {
        assert_eq!(Body::from("tobi").len(), Some(4));
        assert_eq!(Body::from(vec![1u8, 2, 3]).len(), Some(3));
        assert_eq!(Body::Empty.len(), None);
        assert_eq!(Body::from(json!({"foo": "bar"})).len(), None);
    }

    #[test]
    fn structured_serializes_on_into_bytes() {
        let bytes = Body::from(json!({"foo": "bar"})).into_bytes().unwrap();
        assert_eq!(&bytes[..], br#"{"foo":"bar"}"#);
    }

    #[test]
    fn option_maps_none_to_empty() {
        assert!(Body::from(None::<String>).is_empty());
        assert!(!Body::from(Some("hi")).is_empty());
    }
}
