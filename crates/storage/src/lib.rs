//! Execution state storage for Defer's local mode.
//!
//! This crate provides a trait-based store interface with an in-memory
//! implementation that stands in for the remote backend when no credential is
//! configured.

#![warn(missing_docs)]

pub mod trait_;
pub mod memory;

pub use trait_::{ExecutionStore, StorageError, Result};
pub use memory::{InMemoryExecutionStore, RetentionPolicy};
