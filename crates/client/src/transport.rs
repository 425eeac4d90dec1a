//! Transport abstraction.

use async_trait::async_trait;
use defer_core::{
    CancelExecutionRequest, CancelExecutionResponse, EnqueueExecutionRequest,
    EnqueueExecutionResponse, ExecutionId, ExecutionTry, FetchExecutionResponse,
    RescheduleExecutionRequest, RescheduleExecutionResponse,
};

use crate::error::Result;

/// Operations the runtime needs from a remote backend.
///
/// Responses are handed back to callers verbatim; implementations own any
/// transport-level retrying.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit an execution request.
    async fn enqueue_execution(
        &self,
        request: &EnqueueExecutionRequest,
    ) -> Result<EnqueueExecutionResponse>;

    /// Fetch the current state of an execution.
    async fn fetch_execution(&self, id: &ExecutionId) -> Result<FetchExecutionResponse>;

    /// Block until the execution reaches a terminal state.
    async fn wait_execution_result(&self, id: &ExecutionId) -> Result<FetchExecutionResponse>;

    /// Cancel an execution.
    async fn cancel_execution(
        &self,
        request: &CancelExecutionRequest,
    ) -> Result<CancelExecutionResponse>;

    /// List the attempts of an execution.
    async fn get_execution_tries(&self, id: &ExecutionId) -> Result<Vec<ExecutionTry>>;

    /// Move an execution to a new start time.
    async fn reschedule_execution(
        &self,
        request: &RescheduleExecutionRequest,
    ) -> Result<RescheduleExecutionResponse>;
}
