//! Deferred functions without a backend credential.

use std::collections::HashSet;

use defer::{
    Defer, DeferError, DeferredFunctionConfiguration, ExecutionId, ExecutionRecord,
    ExecutionState, ExecutionStore, InMemoryExecutionStore,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Summary {
    a: u32,
    b: String,
}

async fn summarize(_: ()) -> anyhow::Result<Summary> {
    Ok(Summary {
        a: 1,
        b: "x".to_string(),
    })
}

async fn boom(_: ()) -> anyhow::Result<()> {
    anyhow::bail!("boom")
}

async fn add((a, b): (i64, i64)) -> Result<i64, std::num::TryFromIntError> {
    Ok(a + b)
}

async fn explode(_: ()) -> anyhow::Result<u32> {
    panic!("kaboom")
}

async fn half((x,): (f64,)) -> anyhow::Result<f64> {
    Ok(x / 2.0)
}

fn defer() -> Defer {
    Defer::local(InMemoryExecutionStore::new())
}

/// Poll until the background run has recorded a terminal state.
async fn settled(defer: &Defer, id: &ExecutionId) -> ExecutionRecord {
    for _ in 0..1000 {
        let record = defer.get_execution(id).await.unwrap();
        if record.is_terminal() {
            return record;
        }
        tokio::task::yield_now().await;
    }
    panic!("execution {id} never finished");
}

#[tokio::test]
async fn test_enqueue_returns_fresh_ids() {
    let defer = defer();
    assert!(!defer.is_remote());
    let f = defer.wrap("summarize", summarize, Default::default());

    let mut seen = HashSet::new();
    for _ in 0..20 {
        let response = f.call(()).await.unwrap();
        assert!(!response.id.as_str().is_empty());
        assert!(seen.insert(response.id));
    }
}

#[tokio::test]
async fn test_enqueue_returns_before_completion() {
    let defer = defer();
    let f = defer.wrap("summarize", summarize, Default::default());

    let response = f.call(()).await.unwrap();
    // nothing has yielded to the spawned run yet
    let record = defer.get_execution(&response.id).await.unwrap();
    assert_eq!(record.state, ExecutionState::Started);
    assert_eq!(record.result, None);

    let record = settled(&defer, &response.id).await;
    assert_eq!(record.state, ExecutionState::Succeed);
}

#[tokio::test]
async fn test_local_round_trip() {
    let defer = defer();
    let f = defer.wrap("summarize", summarize, Default::default());

    let response = f.call(()).await.unwrap();
    let record = settled(&defer, &response.id).await;

    assert_eq!(record.state, ExecutionState::Succeed);
    assert_eq!(record.result, Some(json!({"a": 1, "b": "x"})));
}

#[tokio::test]
async fn test_lookup_is_idempotent() {
    let defer = defer();
    let f = defer.wrap("summarize", summarize, Default::default());
    let response = f.call(()).await.unwrap();
    settled(&defer, &response.id).await;

    let first = defer.get_execution(&response.id).await.unwrap();
    let second = defer.get_execution(&response.id).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failure_is_stored_as_data() {
    let defer = defer();
    let f = defer.wrap("boom", boom, Default::default());

    let response = f.call(()).await.unwrap();
    let record = settled(&defer, &response.id).await;

    assert_eq!(record.state, ExecutionState::Failed);
    let result = record.result.unwrap();
    assert_eq!(result["message"], "boom");
    assert_eq!(result["name"], "anyhow::Error");
}

#[tokio::test]
async fn test_await_result_returns_value() {
    let defer = defer();
    let add = defer.wrap("add", add, DeferredFunctionConfiguration::default().retry(2));

    assert_eq!(add.await_result().call((40, 2)).await.unwrap(), 42);

    let summary = defer
        .wrap("summarize", summarize, Default::default())
        .await_result()
        .call(())
        .await
        .unwrap();
    assert_eq!(summary, Summary { a: 1, b: "x".to_string() });
}

#[tokio::test]
async fn test_await_result_raises_function_error() {
    let defer = defer();
    let f = defer.wrap("boom", boom, Default::default());

    let err = f.await_result().call(()).await.unwrap_err();
    assert_eq!(err.to_string(), "boom");
    match err {
        DeferError::ExecutionFailed { message, state, .. } => {
            assert_eq!(message, "boom");
            assert_eq!(state, ExecutionState::Failed);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_await_result_records_the_execution() {
    let store = InMemoryExecutionStore::new();
    let defer = Defer::local(store.clone());
    let f = defer.wrap("summarize", summarize, Default::default());

    f.await_result().call(()).await.unwrap();

    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_panic_is_recorded_as_failure() {
    let defer = defer();
    let f = defer.wrap("explode", explode, Default::default());

    let response = f.call(()).await.unwrap();
    let record = settled(&defer, &response.id).await;
    assert_eq!(record.state, ExecutionState::Failed);
    assert_eq!(record.result.unwrap()["message"], "kaboom");

    let tries = defer.get_execution_tries(&response.id).await.unwrap();
    assert_eq!(tries[0].state, ExecutionState::Failed);

    let err = f.await_result().call(()).await.unwrap_err();
    match err {
        DeferError::ExecutionFailed { message, state, .. } => {
            assert_eq!(message, "kaboom");
            assert_eq!(state, ExecutionState::Failed);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unreadable_arguments_leave_no_record() {
    let store = InMemoryExecutionStore::new();
    let defer = Defer::local(store.clone());
    let f = defer.wrap("half", half, Default::default());

    // NaN serializes to null, which does not read back as f64
    let err = f.call((f64::NAN,)).await.unwrap_err();
    assert!(matches!(err, DeferError::Serialization { .. }));
    assert_eq!(store.len().await, 0);

    let err = f.await_result().call((f64::NAN,)).await.unwrap_err();
    assert!(matches!(err, DeferError::Serialization { .. }));
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let defer = defer();
    let id = ExecutionId::new("does-not-exist");

    let err = defer.get_execution(&id).await.unwrap_err();
    assert!(matches!(err, DeferError::NotFound(_)));
    assert!(err.is_not_found());

    let err = defer.get_execution_tries(&id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_tries_has_single_entry() {
    let defer = defer();
    let f = defer.wrap("summarize", summarize, Default::default());
    let response = f.call(()).await.unwrap();
    settled(&defer, &response.id).await;

    let tries = defer.get_execution_tries(&response.id).await.unwrap();
    assert_eq!(tries.len(), 1);
    assert_eq!(tries[0].id, response.id);
    assert_eq!(tries[0].state, ExecutionState::Succeed);
}

#[tokio::test]
async fn test_cancel_and_reschedule_are_no_ops() {
    let defer = defer();
    let f = defer.wrap("summarize", summarize, Default::default());
    let response = f.call(()).await.unwrap();
    let record = settled(&defer, &response.id).await;

    defer.cancel_execution(&response.id, true).await.unwrap();
    defer
        .reschedule_execution(&response.id, Some("1h".into()))
        .await
        .unwrap();

    assert_eq!(defer.get_execution(&response.id).await.unwrap(), record);
}

#[tokio::test]
async fn test_reschedule_rejects_bad_duration() {
    let defer = defer();
    let err = defer
        .reschedule_execution(&ExecutionId::new("x"), Some("eventually".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, DeferError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_options_do_not_change_local_execution() {
    let defer = defer();
    let f = defer
        .wrap("summarize", summarize, Default::default())
        .with_delay("1h")
        .with_discard_after("2h")
        .with_metadata([("env", "test")]);

    let response = f.call(()).await.unwrap();
    let record = settled(&defer, &response.id).await;
    assert_eq!(record.state, ExecutionState::Succeed);
}
