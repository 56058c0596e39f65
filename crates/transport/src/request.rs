//! Request descriptors and raw responses
//!
//! A `RequestAttempt` is built once per logical call and cloned when it has
//! to be issued again. The `retried` marker travels with it so that the
//! session layer can tell a first attempt from a replay without relying on
//! object identity.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// One logical outbound call.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    /// Correlation id for logs; stable across replays of the same call
    pub id: Uuid,
    pub method: Method,
    /// Path relative to the transport base address, or an absolute URL
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    retried: bool,
}

impl RequestAttempt {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Set a header, replacing any previous value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body. Leaves headers alone; content type
    /// defaults are the caller's concern.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self.with_body(body))
    }

    /// Whether this attempt has already been queued for replay once.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Mark the attempt as replayed. Idempotent.
    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Path without any query string.
    pub fn route(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }
}

/// A fully received HTTP response, whatever its status.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON. An empty body is read as `null` so that
    /// unit-like targets (`()`, `Option<T>`) succeed on 204 responses.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(serde_json::Value::Null);
        }
        serde_json::from_slice(&self.body)
    }
}
