//! Error type surfaced by the notes API gateway

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors produced by a [`NotesApi`](super::NotesApi) call.
///
/// The gateway classifies transport failures and non-success responses but
/// never recovers from them; every variant is returned to the caller as-is.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered 404 for the requested resource
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Any other non-2xx response
    #[error("API returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// Connection, timeout or IO failure before a response was received
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response was successful but its body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ApiError {
    /// True for a 404 response. Callers that repeat a delete can use this to
    /// treat the second attempt as a no-op.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status carried by the error, if the server responded at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) | Self::Decode(e) => e.status(),
            Self::Client(_) => None,
        }
    }

    /// Build the error for a non-success response.
    ///
    /// FastAPI-style bodies (`{"detail": "..."}`) contribute their `detail`
    /// string as the message; any other body is kept verbatim.
    pub(crate) fn from_response(status: StatusCode, path: &str, body: &str) -> Self {
        if status == StatusCode::NOT_FOUND {
            return Self::NotFound {
                path: path.to_string(),
            };
        }
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail)
            .map(|d| match d {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_else(|| body.to_string());
        Self::Status { status, message }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Result alias for gateway calls
pub type Result<T> = std::result::Result<T, ApiError>;
