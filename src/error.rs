//! Error types for the dashboard service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main error type for the dashboard service
#[derive(Error, Debug)]
pub enum DeckError {
    /// Missing session, file, or other resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request (missing or mistyped field)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A history log line that is not valid JSON
    ///
    /// The log is the single source of truth, so one damaged line fails the
    /// whole read instead of silently dropping adjacent data.
    #[error("Corrupt history record at line {line}: {source}")]
    CorruptRecord {
        /// 1-based line number within the log file
        line: usize,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Agent CLI binary could not be located
    #[error("Agent CLI not found: {0}")]
    CliNotFound(String),

    /// Agent process is not running
    #[error("Agent is not running")]
    AgentUnavailable,

    /// Agent invocation exceeded its time bound
    #[error("Agent invocation timed out after {0} seconds")]
    AgentTimeout(u64),

    /// Agent invocation failed without usable output
    #[error("Agent invocation failed: {0}")]
    AgentInvocationFailure(String),

    /// Requested path escapes the permitted root
    #[error("Access denied: path escapes the permitted root")]
    AccessDenied,

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error outside the history log
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, DeckError>;

impl DeckError {
    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a corrupt-record error for the given 1-based line
    #[must_use]
    pub fn corrupt_record(line: usize, source: serde_json::Error) -> Self {
        Self::CorruptRecord { line, source }
    }

    /// Create an invocation-failure error
    pub fn invocation(msg: impl Into<String>) -> Self {
        Self::AgentInvocationFailure(msg.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for DeckError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            DeckError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            DeckError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
            DeckError::AccessDenied => (StatusCode::FORBIDDEN, "ACCESS_DENIED"),
            DeckError::CorruptRecord { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CORRUPT_RECORD")
            }
            DeckError::AgentUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "AGENT_UNAVAILABLE"),
            DeckError::AgentTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "AGENT_TIMEOUT"),
            DeckError::CliNotFound(_) | DeckError::AgentInvocationFailure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_FAILURE")
            }
            DeckError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            DeckError::Json(_) => (StatusCode::INTERNAL_SERVER_ERROR, "JSON_ERROR"),
        };

        let body = ErrorBody {
            error: self.to_string(),
            code,
        };

        (status, Json(body)).into_response()
    }
}
