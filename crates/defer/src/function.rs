//! Deferred function values and their modifier chain.

use std::future::Future;
use std::sync::Arc;

use defer_core::{
    DeferredFunctionConfiguration, EnqueueExecutionResponse, ExecutionOptions, Manifest, TimeSpec,
};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::awaiter::AwaitResult;
use crate::client::Backend;
use crate::dispatcher;
use crate::error::Result;
use crate::local::{capture_failure, BoxedFunction};

/// An async function whose calls are enqueued instead of run inline.
///
/// Values are immutable: every modifier returns a new `DeferredFunction` sharing
/// the same function and [`Manifest`], and leaves the receiver untouched.
///
/// `A` is the argument type, usually a tuple, sent to the backend as a positional
/// JSON array. `R` is the value returned by the function.
pub struct DeferredFunction<A, R> {
    name: Arc<str>,
    function: BoxedFunction<A, R>,
    manifest: Arc<Manifest>,
    options: ExecutionOptions,
    pub(crate) backend: Backend,
}

impl<A, R> Clone for DeferredFunction<A, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            function: self.function.clone(),
            manifest: self.manifest.clone(),
            options: self.options.clone(),
            backend: self.backend.clone(),
        }
    }
}

impl<A, R> std::fmt::Debug for DeferredFunction<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredFunction")
            .field("name", &self.name)
            .field("manifest", &self.manifest)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<A, R> DeferredFunction<A, R>
where
    A: Serialize + DeserializeOwned + Send + 'static,
    R: Serialize + DeserializeOwned + Send + 'static,
{
    pub(crate) fn new<F, Fut, E>(
        backend: Backend,
        name: String,
        f: F,
        config: &DeferredFunctionConfiguration,
        cron: Option<String>,
    ) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        let function: BoxedFunction<A, R> = Arc::new(move |args| {
            let fut = f(args);
            async move {
                fut.await
                    .map_err(|e| capture_failure(std::any::type_name::<E>(), e.into()))
            }
            .boxed()
        });

        Self {
            name: name.into(),
            function,
            manifest: Arc::new(Manifest::new(config, cron)),
            options: ExecutionOptions::default(),
            backend,
        }
    }

    /// Enqueue an execution with `args`.
    ///
    /// In local mode the function is started in the background and the id is
    /// returned before it finishes; lookups may observe `started` meanwhile.
    ///
    /// # Panics
    ///
    /// Local mode spawns onto the current tokio runtime and panics when called
    /// outside of one.
    pub async fn call(&self, args: A) -> Result<EnqueueExecutionResponse> {
        dispatcher::enqueue(self, args).await
    }

    /// A callable that enqueues and then waits for the result.
    pub fn await_result(&self) -> AwaitResult<A, R> {
        AwaitResult::new(self.clone())
    }

    /// Copy that delays executions by `delay`, replacing any previous delay.
    #[must_use]
    pub fn with_delay(&self, delay: impl Into<TimeSpec>) -> Self {
        self.with_options(self.options.with_delay(delay.into()))
    }

    /// Copy with `tags` merged over the current metadata; new keys win.
    #[must_use]
    pub fn with_metadata<K, V>(&self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let tags = tags.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.with_options(self.options.with_metadata(tags))
    }

    /// Copy whose executions are dropped if still pending after `value`.
    #[must_use]
    pub fn with_discard_after(&self, value: impl Into<TimeSpec>) -> Self {
        self.with_options(self.options.with_discard_after(value.into()))
    }
}

impl<A, R> DeferredFunction<A, R> {
    fn with_options(&self, options: ExecutionOptions) -> Self {
        Self {
            options,
            ..self.clone()
        }
    }

    /// Name the backend knows the function by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metadata fixed at wrap time.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Options accumulated through modifiers.
    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    pub(crate) fn function(&self) -> &BoxedFunction<A, R> {
        &self.function
    }
}
