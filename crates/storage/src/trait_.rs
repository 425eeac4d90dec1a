//! Execution store trait abstraction.

use async_trait::async_trait;
use defer_core::{ExecutionId, ExecutionRecord, ExecutionState};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// An id was inserted twice
    #[error("execution {0} already exists")]
    AlreadyExists(ExecutionId),

    /// Item not found
    #[error("execution {0} not found")]
    NotFound(ExecutionId),

    /// A record was moved out of a terminal state, or into a non-terminal one
    #[error("execution {id} cannot go from {from} to {to}")]
    InvalidTransition {
        /// Execution id
        id: ExecutionId,
        /// Current state
        from: ExecutionState,
        /// Rejected target state
        to: ExecutionState,
    },
}

/// Store of execution records, keyed by execution id.
///
/// Implementations must keep each record's state monotonic: a record is inserted
/// as `started` and completed exactly once into a terminal state.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert the `started` placeholder for a freshly issued id.
    async fn insert_started(&self, id: &ExecutionId) -> Result<()>;

    /// Replace a `started` placeholder with its terminal record.
    async fn complete(&self, record: ExecutionRecord) -> Result<()>;

    /// Load a record by id.
    async fn get(&self, id: &ExecutionId) -> Option<ExecutionRecord>;

    /// Number of records currently held.
    async fn len(&self) -> usize;

    /// Whether the store holds no records.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
