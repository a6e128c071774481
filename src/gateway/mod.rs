//! Transport gateway: the narrow request interface the session talks through.
//!
//! The session builds paths and bodies and interprets statuses; a transport
//! only moves bytes. `HttpTransport` is the reqwest-backed implementation;
//! tests and embedders can supply their own.

pub mod error;
pub mod http;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

pub use error::{ErrorContext, TransportError};
pub use http::HttpTransport;

/// HTTP method of a service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded service response.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Decoded JSON body. Empty bodies decode to `Value::Null`; bodies that
    /// are not JSON are passed through as `Value::String`.
    pub body: Value,
    pub request_id: Option<String>,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            request_id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn context(&self) -> ErrorContext {
        let ctx = ErrorContext::new().with_status(self.status);
        match &self.request_id {
            Some(id) => ctx.with_request_id(id),
            None => ctx,
        }
    }
}

/// Authenticated request/response transport.
///
/// `path` is relative to the service base URL and already carries any query
/// string. Implementations must not retry on their own accord for `POST`
/// requests: a duplicated vote would be double-counted.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<TransportResponse, TransportError> {
        (**self).send(method, path, body).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<TransportResponse, TransportError> {
        (**self).send(method, path, body).await
    }
}

/// Decode a raw response body.
pub(crate) fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
