//! In-memory execution store.
//!
//! Records live for as long as the store does. The process-wide instance returned
//! by [`InMemoryExecutionStore::global`] therefore keeps every record for the
//! lifetime of the process unless it is given a [`RetentionPolicy`] that evicts
//! finished executions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use defer_core::{ExecutionId, ExecutionRecord, ExecutionState};
use tokio::sync::Mutex;
use tracing::debug;

use crate::trait_::{ExecutionStore, Result, StorageError};

/// Which records the store keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep every record forever
    #[default]
    Unbounded,
    /// Keep at most this many terminal records, evicting the oldest completed
    /// first. `started` records are never evicted.
    KeepLastTerminal(usize),
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<ExecutionId, ExecutionRecord>,
    /// Terminal ids in completion order, oldest first.
    completed: VecDeque<ExecutionId>,
}

/// Execution store backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExecutionStore {
    inner: Arc<Mutex<Inner>>,
    retention: RetentionPolicy,
}

static GLOBAL: OnceLock<InMemoryExecutionStore> = OnceLock::new();

impl InMemoryExecutionStore {
    /// Create an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given retention policy.
    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            retention,
        }
    }

    /// The process-wide store, shared by every client built without an explicit
    /// store.
    pub fn global() -> Self {
        GLOBAL.get_or_init(Self::new).clone()
    }

    /// The retention policy in effect.
    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn insert_started(&self, id: &ExecutionId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.records.contains_key(id) {
            return Err(StorageError::AlreadyExists(id.clone()));
        }
        inner
            .records
            .insert(id.clone(), ExecutionRecord::started(id.clone()));
        debug!("Stored started execution {}", id);
        Ok(())
    }

    async fn complete(&self, record: ExecutionRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let current = inner
            .records
            .get(&record.id)
            .map(|r| r.state)
            .ok_or_else(|| StorageError::NotFound(record.id.clone()))?;

        if current != ExecutionState::Started || !record.state.is_terminal() {
            return Err(StorageError::InvalidTransition {
                id: record.id.clone(),
                from: current,
                to: record.state,
            });
        }

        debug!("Execution {} finished as {}", record.id, record.state);
        inner.completed.push_back(record.id.clone());
        inner.records.insert(record.id.clone(), record);

        if let RetentionPolicy::KeepLastTerminal(limit) = self.retention {
            while inner.completed.len() > limit {
                match inner.completed.pop_front() {
                    Some(evicted) => {
                        inner.records.remove(&evicted);
                        debug!("Evicted execution {}", evicted);
                    }
                    None => break,
                }
            }
        }

        Ok(())
    }

    async fn get(&self, id: &ExecutionId) -> Option<ExecutionRecord> {
        self.inner.lock().await.records.get(id).cloned()
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }
}
