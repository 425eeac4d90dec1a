//! Dispatch of deferred-function calls to the backend or to a local run.

use chrono::Utc;
use defer_core::{
    resolve_or_now, EnqueueExecutionRequest, EnqueueExecutionResponse, ExecutionId,
    ExecutionOptions, Time,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::client::Backend;
use crate::error::{DeferError, Result};
use crate::function::DeferredFunction;
use crate::local;

/// Arguments after going through JSON: the copy sent to the backend, and the
/// source of the fresh value a local run is given.
pub(crate) struct SanitizedArguments(Value);

impl SanitizedArguments {
    pub(crate) fn new<A: Serialize>(args: &A) -> Result<Self> {
        serde_json::to_value(args)
            .map(Self)
            .map_err(|e| DeferError::serialization("function arguments", e))
    }

    /// Positional form sent to the backend.
    pub(crate) fn positional(&self) -> Vec<Value> {
        match &self.0 {
            Value::Array(values) => values.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// A fresh argument value, independent of the caller's.
    pub(crate) fn materialize<A: DeserializeOwned>(&self) -> Result<A> {
        serde_json::from_value(self.0.clone())
            .map_err(|e| DeferError::serialization("function arguments", e))
    }
}

/// Build the enqueue request, resolving relative schedules against `now`.
pub(crate) fn build_request(
    name: &str,
    arguments: &SanitizedArguments,
    options: &ExecutionOptions,
    now: Time,
) -> Result<EnqueueExecutionRequest> {
    let schedule_for = resolve_or_now(options.delay.as_ref(), now)?;
    let discard_after = options
        .discard_after
        .as_ref()
        .map(|spec| spec.resolve(now))
        .transpose()?;

    Ok(EnqueueExecutionRequest {
        name: name.to_string(),
        arguments: arguments.positional(),
        schedule_for,
        metadata: options.metadata.clone(),
        discard_after,
    })
}

/// Enqueue one call of `function`.
pub(crate) async fn enqueue<A, R>(
    function: &DeferredFunction<A, R>,
    args: A,
) -> Result<EnqueueExecutionResponse>
where
    A: Serialize + DeserializeOwned + Send + 'static,
    R: Serialize + DeserializeOwned + Send + 'static,
{
    let arguments = SanitizedArguments::new(&args)?;
    drop(args);
    debug!(function = %function.name(), "Deferred function invoked");

    match &function.backend {
        Backend::Remote(transport) => {
            let request =
                build_request(function.name(), &arguments, function.options(), Utc::now())?;
            Ok(transport.enqueue_execution(&request).await?)
        }
        Backend::Local(store) => {
            debug!(function = %function.name(), "No backend token, running locally");

            let args: A = arguments.materialize()?;
            let id = ExecutionId::generate();
            store.insert_started(&id).await?;

            let store = store.clone();
            let callable = function.function().clone();
            let run_id = id.clone();
            tokio::spawn(async move {
                match local::run(store.as_ref(), run_id.clone(), &callable, args).await {
                    Ok(_) => {}
                    Err(e @ DeferError::Serialization { .. }) => {
                        warn!(id = %run_id, "Local execution result discarded: {}", e);
                    }
                    Err(e) => {
                        error!(id = %run_id, "Cannot record local execution: {}", e);
                    }
                }
            });

            Ok(EnqueueExecutionResponse { id })
        }
    }
}
