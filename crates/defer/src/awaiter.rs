//! Calling a deferred function and waiting for its outcome.

use chrono::Utc;
use defer_core::{ExecutionId, ExecutionRecord, ExecutionState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::Backend;
use crate::dispatcher::{build_request, SanitizedArguments};
use crate::error::{DeferError, Result};
use crate::function::DeferredFunction;
use crate::local;

const GENERIC_FAILURE: &str = "Defer execution failed";

/// Callable returned by [`DeferredFunction::await_result`].
///
/// Each call enqueues an execution and resolves once it reaches a terminal
/// state, returning the function's value or an [`DeferError::ExecutionFailed`].
pub struct AwaitResult<A, R> {
    function: DeferredFunction<A, R>,
}

impl<A, R> Clone for AwaitResult<A, R> {
    fn clone(&self) -> Self {
        Self {
            function: self.function.clone(),
        }
    }
}

impl<A, R> std::fmt::Debug for AwaitResult<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwaitResult")
            .field("function", &self.function)
            .finish()
    }
}

impl<A, R> AwaitResult<A, R>
where
    A: Serialize + DeserializeOwned + Send + 'static,
    R: Serialize + DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(function: DeferredFunction<A, R>) -> Self {
        Self { function }
    }

    /// Run one execution to completion.
    ///
    /// Remotely this enqueues and then blocks on the transport until the
    /// execution is terminal. Locally the function runs in place.
    pub async fn call(&self, args: A) -> Result<R> {
        let function = &self.function;
        let arguments = SanitizedArguments::new(&args)?;
        drop(args);

        let record = match &function.backend {
            Backend::Remote(transport) => {
                let request =
                    build_request(function.name(), &arguments, function.options(), Utc::now())?;
                let enqueued = transport.enqueue_execution(&request).await?;
                debug!(function = %function.name(), id = %enqueued.id, "Waiting for execution result");
                transport.wait_execution_result(&enqueued.id).await?
            }
            Backend::Local(store) => {
                let args: A = arguments.materialize()?;
                let id = ExecutionId::generate();
                store.insert_started(&id).await?;
                local::run(store.as_ref(), id, function.function(), args).await?
            }
        };

        into_outcome(record)
    }

    /// The deferred function being awaited.
    pub fn function(&self) -> &DeferredFunction<A, R> {
        &self.function
    }
}

/// Map a terminal record to the function's value or to an error.
fn into_outcome<R: DeserializeOwned>(record: ExecutionRecord) -> Result<R> {
    match record.state {
        ExecutionState::Succeed => serde_json::from_value(record.result.unwrap_or(Value::Null))
            .map_err(|e| DeferError::serialization("execution result", e)),
        state => Err(reconstruct_error(state, record.result)),
    }
}

/// Rebuild an error from the stored result of an execution that did not succeed.
fn reconstruct_error(state: ExecutionState, result: Option<Value>) -> DeferError {
    let result = result.filter(|value| !value.is_null());

    let message = result
        .as_ref()
        .and_then(|value| value.get("message"))
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string);

    let (message, stack) = match (&result, message) {
        (Some(value), Some(message)) => {
            let stack = value.get("stack").and_then(Value::as_str).map(str::to_string);
            (message, stack)
        }
        (Some(value), None) => (value.to_string(), None),
        (None, _) if state == ExecutionState::Failed => (GENERIC_FAILURE.to_string(), None),
        (None, _) => (format!("{GENERIC_FAILURE}: {state}"), None),
    };

    DeferError::ExecutionFailed {
        message,
        stack,
        state,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(state: ExecutionState, result: Option<Value>) -> ExecutionRecord {
        ExecutionRecord {
            id: ExecutionId::new("e"),
            state,
            result,
        }
    }

    #[test]
    fn test_success_returns_value() {
        let value: (i32, String) =
            into_outcome(record(ExecutionState::Succeed, Some(json!([1, "x"])))).unwrap();
        assert_eq!(value, (1, "x".to_string()));
    }

    #[test]
    fn test_success_with_wrong_shape_is_serialization_error() {
        let err = into_outcome::<u32>(record(ExecutionState::Succeed, Some(json!("nope")))).unwrap_err();
        assert!(matches!(err, DeferError::Serialization { .. }));
    }

    #[test]
    fn test_structured_failure_keeps_message_and_stack() {
        let err = into_outcome::<()>(record(
            ExecutionState::Failed,
            Some(json!({"name": "Error", "message": "boom", "stack": "at main"})),
        ))
        .unwrap_err();

        match err {
            DeferError::ExecutionFailed { message, stack, state, .. } => {
                assert_eq!(message, "boom");
                assert_eq!(stack.as_deref(), Some("at main"));
                assert_eq!(state, ExecutionState::Failed);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unstructured_failure_is_raised_as_is() {
        let err = into_outcome::<()>(record(ExecutionState::Failed, Some(json!("plain")))).unwrap_err();
        match err {
            DeferError::ExecutionFailed { message, result, .. } => {
                assert_eq!(message, "\"plain\"");
                assert_eq!(result, Some(json!("plain")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failure_without_result_is_generic() {
        let err = into_outcome::<()>(record(ExecutionState::Failed, None)).unwrap_err();
        assert_eq!(err.to_string(), GENERIC_FAILURE);

        let err = into_outcome::<()>(record(ExecutionState::Cancelled, None)).unwrap_err();
        assert_eq!(err.to_string(), "Defer execution failed: cancelled");
    }
}
