//! Error types for loading report records.
//!
//! Aggregations never fail; these errors come from the edges: malformed
//! payloads, the dashboard API, and the filesystem.

use thiserror::Error;

/// Errors raised while obtaining or decoding report records.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Input does not have the shape an operation requires.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The API rejected the bearer token (or none was sent).
    #[error("Authentication required: the API answered 401, check --token")]
    Unauthorized,

    /// The API answered with a non-success status.
    #[error("API error {status}: {body}")]
    Http { status: u16, body: String },

    /// The API envelope reported `success: false`.
    #[error("API reported failure: {message}")]
    Api { message: String },

    /// The request never produced a response.
    #[error("{message}")]
    Transport { message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    /// Shorthand for [`ReportError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Map a reqwest failure to a readable transport error.
    pub fn from_transport(err: reqwest::Error, base_url: &str, timeout_seconds: u64) -> Self {
        let message = if err.is_timeout() {
            format!("Request timed out after {}s", timeout_seconds)
        } else if err.is_connect() {
            format!("Cannot connect to the dashboard API at {}", base_url)
        } else {
            format!("Failed to send request: {}", err)
        };
        Self::Transport { message }
    }
}

pub type Result<T, E = ReportError> = std::result::Result<T, E>;
