//! Deferred functions.
//!
//! Wrapping an async function with [`Defer::wrap`] produces a
//! [`DeferredFunction`]: calling it enqueues an execution on the Defer backend
//! instead of running the function inline. When no backend credential is
//! configured the function runs in-process and its outcome is recorded in an
//! [`ExecutionStore`], so lookups behave the same in both modes.
//!
//! ```ignore
//! use defer::{Defer, DeferredFunctionConfiguration};
//!
//! async fn send_email((to,): (String,)) -> anyhow::Result<()> { /* ... */ Ok(()) }
//!
//! let defer = Defer::from_env()?;
//! let send_email = defer
//!     .wrap("send_email", send_email, DeferredFunctionConfiguration::default().retry(3))
//!     .with_delay("10m");
//! let execution = send_email.call(("bob@example.com".to_string(),)).await?;
//! ```

#![warn(missing_docs)]

mod awaiter;
mod client;
mod dispatcher;
mod error;
mod function;
mod local;

pub use awaiter::AwaitResult;
pub use client::Defer;
pub use error::{DeferError, Result};
pub use function::DeferredFunction;

pub use defer_client::{ClientConfig, HttpTransport, Transport};
pub use defer_core::{
    CancelExecutionResponse, Concurrency, DeferredFunctionConfiguration,
    EnqueueExecutionResponse, ExecutionId, ExecutionMetadata, ExecutionOptions, ExecutionRecord,
    ExecutionState, ExecutionTry, FunctionFailure, Manifest, PartialRetryPolicy, RetryConfig,
    RetryPolicy, RescheduleExecutionResponse, TimeSpec, INTERNAL_VERSION,
};
pub use defer_storage::{ExecutionStore, InMemoryExecutionStore, RetentionPolicy};
