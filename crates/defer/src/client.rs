//! Entry point: mode selection, wrapping and execution lookups.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use defer_client::{ClientConfig, HttpTransport, Transport};
use defer_core::{
    resolve_or_now, CancelExecutionRequest, CancelExecutionResponse,
    DeferredFunctionConfiguration, ExecutionId, ExecutionRecord, ExecutionTry,
    RescheduleExecutionRequest, RescheduleExecutionResponse, TimeSpec,
};
use defer_storage::{ExecutionStore, InMemoryExecutionStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{DeferError, Result};
use crate::function::DeferredFunction;

/// Where calls go.
#[derive(Clone)]
pub(crate) enum Backend {
    /// A credential is configured: calls go to the backend.
    Remote(Arc<dyn Transport>),
    /// No credential: calls run in-process and are recorded in the store.
    Local(Arc<dyn ExecutionStore>),
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Remote(_) => f.write_str("Remote"),
            Backend::Local(_) => f.write_str("Local"),
        }
    }
}

/// Handle to the Defer backend, or to its in-process stand-in.
///
/// The mode is fixed when the handle is built: with a credential every call goes
/// through the [`Transport`], without one every call runs locally against an
/// [`ExecutionStore`].
#[derive(Debug, Clone)]
pub struct Defer {
    backend: Backend,
}

impl Defer {
    /// Build from `DEFER_TOKEN` / `DEFER_ENDPOINT`.
    ///
    /// Without a token the handle runs locally against the process-wide store.
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// Build from explicit configuration.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        if config.has_token() {
            info!(endpoint = %config.endpoint, "Using Defer backend");
            Ok(Self::remote(HttpTransport::new(config)?))
        } else {
            debug!("No Defer token configured, executions will run locally");
            Ok(Self::local(InMemoryExecutionStore::global()))
        }
    }

    /// Remote mode over the given transport.
    pub fn remote(transport: impl Transport + 'static) -> Self {
        Self {
            backend: Backend::Remote(Arc::new(transport)),
        }
    }

    /// Local mode over the given store.
    pub fn local(store: impl ExecutionStore + 'static) -> Self {
        Self {
            backend: Backend::Local(Arc::new(store)),
        }
    }

    /// Whether calls are sent to a backend.
    pub fn is_remote(&self) -> bool {
        matches!(self.backend, Backend::Remote(_))
    }

    /// Wrap `f` as a deferred function named `name`.
    pub fn wrap<A, R, E, F, Fut>(
        &self,
        name: impl Into<String>,
        f: F,
        config: DeferredFunctionConfiguration,
    ) -> DeferredFunction<A, R>
    where
        A: Serialize + DeserializeOwned + Send + 'static,
        R: Serialize + DeserializeOwned + Send + 'static,
        E: Into<anyhow::Error> + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    {
        DeferredFunction::new(self.backend.clone(), name.into(), f, &config, None)
    }

    /// Wrap `f` as a deferred function run on the `cron` schedule.
    pub fn wrap_cron<A, R, E, F, Fut>(
        &self,
        name: impl Into<String>,
        f: F,
        cron: impl Into<String>,
        config: DeferredFunctionConfiguration,
    ) -> DeferredFunction<A, R>
    where
        A: Serialize + DeserializeOwned + Send + 'static,
        R: Serialize + DeserializeOwned + Send + 'static,
        E: Into<anyhow::Error> + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    {
        DeferredFunction::new(
            self.backend.clone(),
            name.into(),
            f,
            &config,
            Some(cron.into()),
        )
    }

    /// Current state of an execution.
    ///
    /// A local execution may still be `started`; that is not an error.
    pub async fn get_execution(&self, id: &ExecutionId) -> Result<ExecutionRecord> {
        match &self.backend {
            Backend::Remote(transport) => Ok(transport.fetch_execution(id).await?),
            Backend::Local(store) => store
                .get(id)
                .await
                .ok_or_else(|| DeferError::NotFound(id.clone())),
        }
    }

    /// Attempts of an execution. Local executions always have exactly one.
    pub async fn get_execution_tries(&self, id: &ExecutionId) -> Result<Vec<ExecutionTry>> {
        match &self.backend {
            Backend::Remote(transport) => Ok(transport.get_execution_tries(id).await?),
            Backend::Local(store) => store
                .get(id)
                .await
                .map(|record| {
                    vec![ExecutionTry {
                        id: record.id,
                        state: record.state,
                    }]
                })
                .ok_or_else(|| DeferError::NotFound(id.clone())),
        }
    }

    /// Cancel an execution. Local executions cannot be cancelled; this is a
    /// no-op for them.
    pub async fn cancel_execution(
        &self,
        id: &ExecutionId,
        force: bool,
    ) -> Result<CancelExecutionResponse> {
        match &self.backend {
            Backend::Remote(transport) => {
                let request = CancelExecutionRequest {
                    id: id.clone(),
                    force,
                };
                Ok(transport.cancel_execution(&request).await?)
            }
            Backend::Local(_) => Ok(CancelExecutionResponse::default()),
        }
    }

    /// Move an execution to `when`, or to now if `None`. A no-op for local
    /// executions.
    pub async fn reschedule_execution(
        &self,
        id: &ExecutionId,
        when: Option<TimeSpec>,
    ) -> Result<RescheduleExecutionResponse> {
        let request = RescheduleExecutionRequest {
            id: id.clone(),
            schedule_for: resolve_or_now(when.as_ref(), Utc::now())?,
        };

        match &self.backend {
            Backend::Remote(transport) => Ok(transport.reschedule_execution(&request).await?),
            Backend::Local(_) => Ok(RescheduleExecutionResponse::default()),
        }
    }
}
