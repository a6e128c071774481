//! Error types for the transport gateway.

use thiserror::Error;

/// Additional context captured from a service response for debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// HTTP status code returned by the service.
    pub http_status: Option<u16>,
    /// Request ID from the service (x-request-id header).
    pub request_id: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

/// Failures of the transport itself: no usable response came back.
///
/// A non-2xx status is *not* a transport error; the transport hands it back
/// as a normal response and the session classifies it.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP/network error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body exceeded the size limit.
    #[error("response too large: {0} bytes")]
    ResponseTooLarge(usize),

    /// Configuration error (missing API key, bad header value, etc.).
    #[error("configuration error: {0}")]
    Config(String),
}

impl TransportError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Short error code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Http(e) if e.is_timeout() => "timeout",
            Self::Http(e) if e.is_connect() => "connect_error",
            Self::Http(_) => "http_error",
            Self::ResponseTooLarge(_) => "response_too_large",
            Self::Config(_) => "config_error",
        }
    }
}
