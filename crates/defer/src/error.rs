//! Errors surfaced by deferred functions and lookups.

use defer_client::ClientError;
use defer_core::{CoreError, ExecutionId, ExecutionState};
use defer_storage::StorageError;
use serde_json::Value;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, DeferError>;

/// Errors surfaced to callers of the runtime.
#[derive(Debug, thiserror::Error)]
pub enum DeferError {
    /// A configuration or schedule value was rejected.
    #[error(transparent)]
    InvalidConfiguration(#[from] CoreError),

    /// Arguments or a result could not go through JSON.
    #[error("cannot serialize {what}: {reason}")]
    Serialization {
        /// What was being serialized
        what: &'static str,
        /// Serializer message
        reason: String,
    },

    /// No local execution has this id.
    #[error("execution {0} not found")]
    NotFound(ExecutionId),

    /// The deferred function did not succeed. Only raised by
    /// [`AwaitResult::call`](crate::AwaitResult::call).
    #[error("{message}")]
    ExecutionFailed {
        /// Message of the original error
        message: String,
        /// Stack captured when the function failed
        stack: Option<String>,
        /// Terminal state the execution ended in
        state: ExecutionState,
        /// Raw stored result
        result: Option<Value>,
    },

    /// The backend transport failed.
    #[error(transparent)]
    Transport(#[from] ClientError),

    /// The local store rejected an operation.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DeferError {
    pub(crate) fn serialization(what: &'static str, err: serde_json::Error) -> Self {
        Self::Serialization {
            what,
            reason: err.to_string(),
        }
    }

    /// Whether the error means the execution does not exist, locally or remotely.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DeferError::NotFound(_) | DeferError::Transport(ClientError::NotFound(_))
        )
    }
}
