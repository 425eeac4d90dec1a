//! Defer core data models.
//!
//! This crate defines the deferred-function metadata (manifest, retry policy,
//! execution options), the execution record shapes shared by the local store and
//! the remote backend, and the resolution of relative schedules into instants.

#![warn(missing_docs)]

// Identities
mod id;
mod error;

// Deferred-function metadata
mod retry;
mod manifest;
mod schedule;

// Execution lifecycle and wire shapes
mod execution;

// Re-exports
pub use id::ExecutionId;
pub use error::{CoreError, Result};

pub use retry::{
    PartialRetryPolicy, RetryConfig, RetryPolicy, RETRY_MAX_ATTEMPTS_PLACEHOLDER,
};
pub use manifest::{
    Concurrency, DeferredFunctionConfiguration, ExecutionMetadata, ExecutionOptions, Manifest,
    INTERNAL_VERSION,
};
pub use schedule::{resolve_or_now, TimeSpec};

pub use execution::{
    CancelExecutionRequest, CancelExecutionResponse, EnqueueExecutionRequest,
    EnqueueExecutionResponse, ExecutionRecord, ExecutionState, ExecutionTry, FunctionFailure,
    RescheduleExecutionRequest, RescheduleExecutionResponse,
};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// Record returned by the backend when an execution is fetched.
///
/// Local mode returns the same shape straight out of the store.
pub type FetchExecutionResponse = ExecutionRecord;
