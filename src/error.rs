//! Error taxonomy shared by every session operation.

use serde_json::Value;
use thiserror::Error;

use crate::gateway::{ErrorContext, TransportError, TransportResponse};
use crate::options::Options;

/// Errors surfaced by the client.
///
/// Every resource operation reports failures through this one enum, so
/// callers match on the kind of failure rather than on which resource failed.
#[derive(Debug, Error)]
pub enum SorterError {
    /// Caller-supplied data violates a local precondition. Raised before any
    /// request is sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// A strict fetch or a pair request found nothing.
    #[error("not found: {message}")]
    NotFound {
        message: String,
        context: Option<ErrorContext>,
    },

    /// The service rejected the API key. Fatal for the session.
    #[error("authentication failed (HTTP {status}): {message}")]
    Auth {
        status: u16,
        message: String,
        context: ErrorContext,
    },

    /// Any other failure status from the service, message verbatim.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        context: ErrorContext,
    },

    /// An option key or value was not recognized.
    #[error("configuration error: option `{key}`: {message}")]
    Configuration { key: String, message: String },

    /// The transport failed before any response came back.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl SorterError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            context: None,
        }
    }

    pub fn unknown_option(key: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.into(),
            message: format!(
                "unrecognized option; expected one of {}",
                Options::KEYS.join(", ")
            ),
        }
    }

    pub fn invalid_option(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Malformed success body: the service answered but not in the expected shape.
    pub(crate) fn unexpected_body(resp: &TransportResponse, what: &str, err: impl ToString) -> Self {
        Self::Api {
            status: resp.status,
            message: format!("unexpected {what} response: {}", err.to_string()),
            context: resp.context(),
        }
    }

    /// Classify a non-success response.
    pub fn from_response(resp: &TransportResponse) -> Self {
        let message = server_message(&resp.body)
            .unwrap_or_else(|| format!("HTTP {}", resp.status));
        let context = resp.context();

        match resp.status {
            401 | 403 => Self::Auth {
                status: resp.status,
                message,
                context,
            },
            404 => Self::NotFound {
                message,
                context: Some(context),
            },
            status => Self::Api {
                status,
                message,
                context,
            },
        }
    }

    /// Get a short error code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Auth { .. } => "auth_error",
            Self::Api { .. } => "api_error",
            Self::Configuration { .. } => "configuration_error",
            Self::Transport(e) => e.code(),
        }
    }

    /// HTTP status, when the failure came from a service response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::NotFound { context, .. } => context.as_ref().and_then(|c| c.http_status),
            _ => None,
        }
    }

    /// Get the error context if available.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::NotFound { context, .. } => context.as_ref(),
            Self::Auth { context, .. } => Some(context),
            Self::Api { context, .. } => Some(context),
            Self::Validation(_) | Self::Configuration { .. } | Self::Transport(_) => None,
        }
    }

    /// Get the request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        self.context().and_then(|c| c.request_id.as_deref())
    }

    /// Whether the session can keep being used after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

/// Pull the server-provided message out of an error body.
fn server_message(body: &Value) -> Option<String> {
    match body {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => {
            let field = map
                .get("error")
                .or_else(|| map.get("message"))
                .or_else(|| map.get("detail"))?;
            match field {
                Value::String(s) => Some(s.clone()),
                Value::Object(inner) => inner
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                other => Some(other.to_string()),
            }
        }
        _ => None,
    }
}
