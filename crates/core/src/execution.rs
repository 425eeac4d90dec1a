//! Execution lifecycle and the request/response shapes exchanged with the backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::ExecutionId;
use crate::manifest::ExecutionMetadata;
use crate::Time;

/// Lifecycle state of an execution.
///
/// Local executions only go `Started -> Succeed | Failed`; the remaining states
/// are reported by the remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    /// Accepted, waiting for its schedule
    Created,
    /// Running
    Started,
    /// Finished successfully
    Succeed,
    /// Finished with an error
    Failed,
    /// Cancelled before completion
    Cancelled,
    /// Killed while running
    Aborted,
    /// Dropped after its discard deadline
    Discarded,
}

impl ExecutionState {
    /// Whether no further transition can happen.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionState::Created | ExecutionState::Started)
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionState::Created => "created",
            ExecutionState::Started => "started",
            ExecutionState::Succeed => "succeed",
            ExecutionState::Failed => "failed",
            ExecutionState::Cancelled => "cancelled",
            ExecutionState::Aborted => "aborted",
            ExecutionState::Discarded => "discarded",
        };
        f.write_str(s)
    }
}

/// Current state of one execution and, once finished, its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Execution id
    pub id: ExecutionId,
    /// Current state
    pub state: ExecutionState,
    /// Returned value on success, [`FunctionFailure`] on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ExecutionRecord {
    /// Placeholder record for an execution that has just been dispatched.
    pub fn started(id: ExecutionId) -> Self {
        Self {
            id,
            state: ExecutionState::Started,
            result: None,
        }
    }

    /// Whether the record is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Serializable surrogate of an error raised by a deferred function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionFailure {
    /// Error type name
    pub name: String,
    /// Error message
    pub message: String,
    /// Message of the underlying cause, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Captured backtrace, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// One attempt of an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTry {
    /// Attempt id
    pub id: ExecutionId,
    /// State of the attempt
    pub state: ExecutionState,
}

/// Request submitted to the backend to enqueue an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueExecutionRequest {
    /// Name of the deferred function
    pub name: String,
    /// Positional arguments
    pub arguments: Vec<Value>,
    /// Earliest start
    pub schedule_for: Time,
    /// Execution tags
    pub metadata: ExecutionMetadata,
    /// Deadline after which the execution is dropped if still pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discard_after: Option<Time>,
}

/// Response to an enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueExecutionResponse {
    /// Id of the new execution
    pub id: ExecutionId,
}

/// Request to cancel an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelExecutionRequest {
    /// Execution id
    pub id: ExecutionId,
    /// Abort the execution even if it is already running
    pub force: bool,
}

/// Response to a cancel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelExecutionResponse {}

/// Request to move an execution to a new start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleExecutionRequest {
    /// Execution id
    pub id: ExecutionId,
    /// New earliest start
    pub schedule_for: Time,
}

/// Response to a reschedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleExecutionResponse {}
