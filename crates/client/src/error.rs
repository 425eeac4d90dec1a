//! Error types for the transport.

use defer_core::ExecutionId;
use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors reported by a transport.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The backend rejected the request.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The backend does not know the execution.
    #[error("execution {0} not found")]
    NotFound(ExecutionId),

    /// Configuration error.
    #[error("configuration error: {reason}")]
    Config {
        /// What is wrong
        reason: String,
    },

    /// HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
