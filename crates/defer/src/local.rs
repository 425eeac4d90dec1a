//! In-process execution used when no backend is configured.

use std::any::Any;
use std::backtrace::BacktraceStatus;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use defer_core::{ExecutionId, ExecutionRecord, ExecutionState, FunctionFailure};
use defer_storage::ExecutionStore;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{DeferError, Result};

/// Type-erased original function. Errors are already converted into their
/// serializable surrogate.
pub(crate) type BoxedFunction<A, R> =
    Arc<dyn Fn(A) -> BoxFuture<'static, std::result::Result<R, FunctionFailure>> + Send + Sync>;

/// Build the serializable surrogate of an error returned by a wrapped function.
pub(crate) fn capture_failure(name: &str, error: anyhow::Error) -> FunctionFailure {
    let stack = match error.backtrace().status() {
        BacktraceStatus::Captured => Some(error.backtrace().to_string()),
        _ => None,
    };

    FunctionFailure {
        name: name.to_string(),
        message: error.to_string(),
        cause: error.chain().nth(1).map(|cause| cause.to_string()),
        stack,
    }
}

/// Surrogate for a wrapped function that panicked.
fn capture_panic(payload: Box<dyn Any + Send>) -> FunctionFailure {
    let message = match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(_) => "function panicked".to_string(),
        },
    };

    FunctionFailure {
        name: "panic".to_string(),
        message,
        cause: None,
        stack: None,
    }
}

/// Run the function, then replace the `started` placeholder of `id` with the
/// outcome.
///
/// A function error or panic is recorded as a `failed` execution. A result that cannot go
/// through JSON is returned as [`DeferError::Serialization`] and nothing is
/// recorded.
pub(crate) async fn run<A, R>(
    store: &dyn ExecutionStore,
    id: ExecutionId,
    function: &BoxedFunction<A, R>,
    args: A,
) -> Result<ExecutionRecord>
where
    R: Serialize,
{
    let outcome = AssertUnwindSafe(async { function(args).await })
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(capture_panic(payload)));

    let (state, result) = match outcome {
        Ok(value) => (ExecutionState::Succeed, round_trip(&value)?),
        Err(failure) => (ExecutionState::Failed, round_trip(&failure)?),
    };

    let record = ExecutionRecord {
        id,
        state,
        result: Some(result),
    };
    store.complete(record.clone()).await?;
    info!(id = %record.id, state = %record.state, "Local execution finished");

    Ok(record)
}

/// Force a value through JSON text so the stored result is exactly what a
/// backend would have returned.
fn round_trip<T: Serialize>(value: &T) -> Result<Value> {
    let text =
        serde_json::to_string(value).map_err(|e| DeferError::serialization("function return", e))?;
    serde_json::from_str(&text).map_err(|e| DeferError::serialization("function return", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use defer_storage::InMemoryExecutionStore;
    use serde_json::json;
    use std::collections::HashMap;

    fn boxed<A, R, F>(f: F) -> BoxedFunction<A, R>
    where
        F: Fn(A) -> std::result::Result<R, FunctionFailure> + Send + Sync + 'static,
        R: Send + 'static,
    {
        Arc::new(move |args| {
            let outcome = f(args);
            async move { outcome }.boxed()
        })
    }

    #[test]
    fn test_capture_failure_keeps_message_and_cause() {
        let error = anyhow::anyhow!("disk full").context("cannot write report");
        let failure = capture_failure("anyhow::Error", error);
        assert_eq!(failure.name, "anyhow::Error");
        assert_eq!(failure.message, "cannot write report");
        assert_eq!(failure.cause.as_deref(), Some("disk full"));
    }

    #[tokio::test]
    async fn test_success_is_recorded() {
        let store = InMemoryExecutionStore::new();
        let id = ExecutionId::generate();
        store.insert_started(&id).await.unwrap();

        let function = boxed(|n: u32| Ok(json!({"doubled": n * 2})));
        let record = run(&store, id.clone(), &function, 21).await.unwrap();

        assert_eq!(record.state, ExecutionState::Succeed);
        assert_eq!(record.result, Some(json!({"doubled": 42})));
        assert_eq!(store.get(&id).await, Some(record));
    }

    #[tokio::test]
    async fn test_failure_is_recorded_as_data() {
        let store = InMemoryExecutionStore::new();
        let id = ExecutionId::generate();
        store.insert_started(&id).await.unwrap();

        let function = boxed(|_: ()| -> std::result::Result<(), FunctionFailure> {
            Err(capture_failure("anyhow::Error", anyhow::anyhow!("boom")))
        });
        let record = run(&store, id.clone(), &function, ()).await.unwrap();

        assert_eq!(record.state, ExecutionState::Failed);
        let result = record.result.unwrap();
        assert_eq!(result["message"], "boom");
        assert_eq!(result["name"], "anyhow::Error");
    }

    #[tokio::test]
    async fn test_panic_is_recorded_as_failure() {
        let store = InMemoryExecutionStore::new();
        let id = ExecutionId::generate();
        store.insert_started(&id).await.unwrap();

        let function = boxed(|n: u32| -> std::result::Result<u32, FunctionFailure> {
            panic!("cannot handle {n}")
        });
        let record = run(&store, id.clone(), &function, 7).await.unwrap();

        assert_eq!(record.state, ExecutionState::Failed);
        let result = record.result.unwrap();
        assert_eq!(result["name"], "panic");
        assert_eq!(result["message"], "cannot handle 7");
        assert_eq!(store.get(&id).await.unwrap().state, ExecutionState::Failed);
    }

    #[test]
    fn test_capture_panic_payloads() {
        assert_eq!(capture_panic(Box::new("static")).message, "static");
        assert_eq!(capture_panic(Box::new(String::from("owned"))).message, "owned");
        assert_eq!(capture_panic(Box::new(42_u8)).message, "function panicked");
    }

    #[tokio::test]
    async fn test_unserializable_result_is_not_recorded() {
        let store = InMemoryExecutionStore::new();
        let id = ExecutionId::generate();
        store.insert_started(&id).await.unwrap();

        // JSON object keys must be strings
        let function = boxed(|_: ()| {
            let mut map = HashMap::new();
            map.insert((1, 2), "x");
            Ok(map)
        });
        let err = run(&store, id.clone(), &function, ()).await.unwrap_err();

        assert!(matches!(err, DeferError::Serialization { .. }));
        assert_eq!(store.get(&id).await.unwrap().state, ExecutionState::Started);
    }
}
