//! Persistence contracts (spec.md §6 "Persistence contracts").
//!
//! Small behavioral traits, not a generic repository abstraction: each
//! covers exactly the operations the spec names for that collaborator.
//! An in-memory implementation backs unit tests; a Postgres
//! implementation backs production (`linkflow-history::persistence::postgres`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use linkflow_types::{EngineError, ExecutionKey, HistoryEvent, MutableState, Result};

/// `AppendEvents(key, events, expectedVersion) -> ok | OptimisticLock`,
/// `GetEvents(key, firstID, lastID) -> events[]`.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append_events(
        &self,
        key: &ExecutionKey,
        events: &[HistoryEvent],
        expected_version: i64,
    ) -> Result<()>;

    async fn get_events(
        &self,
        key: &ExecutionKey,
        first_event_id: u64,
        last_event_id: u64,
    ) -> Result<Vec<HistoryEvent>>;

    /// All events for a run, from event 1. Used by `Replay`.
    async fn get_all_events(&self, key: &ExecutionKey) -> Result<Vec<HistoryEvent>> {
        self.get_events(key, 1, u64::MAX).await
    }
}

/// `GetMutableState(key)`, `UpdateMutableState(key, state, expectedVersion)`.
#[async_trait]
pub trait MutableStateStore: Send + Sync {
    async fn get_mutable_state(&self, key: &ExecutionKey) -> Result<MutableState>;

    async fn update_mutable_state(
        &self,
        key: &ExecutionKey,
        state: &MutableState,
        expected_version: i64,
    ) -> Result<()>;

    /// Initializes state for a key that has never been seen. Distinct
    /// from `update_mutable_state` so stores can choose an `INSERT` vs.
    /// `UPDATE ... WHERE version = ?` statement without probing first.
    async fn create_mutable_state(&self, key: &ExecutionKey, state: &MutableState) -> Result<()>;
}

/// A single open/closed execution summary, as recorded for
/// `ListWorkflowExecutions`/`ListExecutions` (spec.md §4.1, §4.3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct VisibilityRecord {
    pub key: ExecutionKey,
    pub workflow_type: String,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
}

/// `RecordWorkflowExecutionStarted|Closed`,
/// `ListOpen|ClosedWorkflowExecutions`. A thin, optional collaborator —
/// named in spec.md as a pluggable interface whose full design is
/// explicitly out of scope, but the engine's own `ListWorkflowExecutions`
/// operation needs *some* concrete backing to be complete (SPEC_FULL.md §2).
#[async_trait]
pub trait VisibilityStore: Send + Sync {
    async fn record_started(&self, record: VisibilityRecord) -> Result<()>;
    async fn record_closed(
        &self,
        key: &ExecutionKey,
        status: String,
        close_time: DateTime<Utc>,
    ) -> Result<()>;
    async fn list_open(&self, namespace_id: &str, page_size: usize) -> Result<Vec<VisibilityRecord>>;
    async fn list_closed(&self, namespace_id: &str, page_size: usize) -> Result<Vec<VisibilityRecord>>;
}

/// `SaveSnapshot/GetLatestSnapshot/DeleteSnapshots` (spec.md §6, marked
/// optional). Used by `Replay` to avoid re-applying an entire event
/// history for long-running executions (SPEC_FULL.md §2).
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save_snapshot(&self, key: &ExecutionKey, at_event_id: u64, state: &MutableState) -> Result<()>;
    async fn get_latest_snapshot(&self, key: &ExecutionKey) -> Result<Option<(u64, MutableState)>>;
    async fn delete_snapshots(&self, key: &ExecutionKey) -> Result<()>;
}

/// Maps a `sqlx::Error` onto the shared taxonomy; every Postgres-backed
/// store funnels its driver errors through this so callers never match
/// on `sqlx::Error` directly.
pub fn map_sqlx_error(err: sqlx::Error) -> EngineError {
    EngineError::Store(err.to_string())
}
