//! In-memory implementations of the persistence contracts — the default
//! backing for unit tests and for `ReplayFingerprint`/integrity tests
//! that don't need a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use linkflow_types::{EngineError, ExecutionKey, HistoryEvent, MutableState, Result};

use super::store::{EventStore, MutableStateStore, SnapshotStore, VisibilityRecord, VisibilityStore};

#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<ExecutionKey, Vec<HistoryEvent>>>,
    /// Version recorded at the last successful append, mirroring
    /// `MutableState.db_version` at append time (spec.md §3 invariant).
    versions: RwLock<HashMap<ExecutionKey, i64>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_events(
        &self,
        key: &ExecutionKey,
        events: &[HistoryEvent],
        expected_version: i64,
    ) -> Result<()> {
        let mut versions = self.versions.write();
        let current = versions.get(key).copied().unwrap_or(0);
        if current != expected_version {
            return Err(EngineError::OptimisticLock {
                expected: expected_version,
                actual: current,
            });
        }
        let mut store = self.events.write();
        store.entry(key.clone()).or_default().extend_from_slice(events);
        versions.insert(key.clone(), current + 1);
        Ok(())
    }

    async fn get_events(
        &self,
        key: &ExecutionKey,
        first_event_id: u64,
        last_event_id: u64,
    ) -> Result<Vec<HistoryEvent>> {
        let store = self.events.read();
        let events = store
            .get(key)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.event_id >= first_event_id && e.event_id <= last_event_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }
}

#[derive(Default)]
pub struct InMemoryMutableStateStore {
    states: RwLock<HashMap<ExecutionKey, MutableState>>,
}

impl InMemoryMutableStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MutableStateStore for InMemoryMutableStateStore {
    async fn get_mutable_state(&self, key: &ExecutionKey) -> Result<MutableState> {
        self.states
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::ExecutionNotFound(key.clone()))
    }

    async fn update_mutable_state(
        &self,
        key: &ExecutionKey,
        state: &MutableState,
        expected_version: i64,
    ) -> Result<()> {
        let mut states = self.states.write();
        let current_version = states.get(key).map(|s| s.db_version).unwrap_or(0);
        if current_version != expected_version {
            return Err(EngineError::OptimisticLock {
                expected: expected_version,
                actual: current_version,
            });
        }
        states.insert(key.clone(), state.clone());
        Ok(())
    }

    async fn create_mutable_state(&self, key: &ExecutionKey, state: &MutableState) -> Result<()> {
        let mut states = self.states.write();
        states.insert(key.clone(), state.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryVisibilityStore {
    records: RwLock<HashMap<ExecutionKey, VisibilityRecord>>,
}

impl InMemoryVisibilityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VisibilityStore for InMemoryVisibilityStore {
    async fn record_started(&self, record: VisibilityRecord) -> Result<()> {
        self.records.write().insert(record.key.clone(), record);
        Ok(())
    }

    async fn record_closed(
        &self,
        key: &ExecutionKey,
        status: String,
        close_time: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(record) = self.records.write().get_mut(key) {
            record.status = status;
            record.close_time = Some(close_time);
        }
        Ok(())
    }

    async fn list_open(&self, namespace_id: &str, page_size: usize) -> Result<Vec<VisibilityRecord>> {
        let records = self.records.read();
        Ok(records
            .values()
            .filter(|r| r.key.namespace_id == namespace_id && r.close_time.is_none())
            .take(page_size)
            .cloned()
            .collect())
    }

    async fn list_closed(&self, namespace_id: &str, page_size: usize) -> Result<Vec<VisibilityRecord>> {
        let records = self.records.read();
        Ok(records
            .values()
            .filter(|r| r.key.namespace_id == namespace_id && r.close_time.is_some())
            .take(page_size)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<ExecutionKey, (u64, MutableState)>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save_snapshot(&self, key: &ExecutionKey, at_event_id: u64, state: &MutableState) -> Result<()> {
        self.snapshots
            .write()
            .insert(key.clone(), (at_event_id, state.clone()));
        Ok(())
    }

    async fn get_latest_snapshot(&self, key: &ExecutionKey) -> Result<Option<(u64, MutableState)>> {
        Ok(self.snapshots.read().get(key).cloned())
    }

    async fn delete_snapshots(&self, key: &ExecutionKey) -> Result<()> {
        self.snapshots.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkflow_types::{EventAttributes, TimeoutConfig};
    use serde_json::json;

    fn key() -> ExecutionKey {
        ExecutionKey::new("ns", "wf", "run1")
    }

    fn started(id: u64) -> HistoryEvent {
        HistoryEvent::new(
            id,
            0,
            EventAttributes::ExecutionStarted {
                workflow_type: "wf".into(),
                task_queue: "q".into(),
                input: json!({}),
                timeout_config: TimeoutConfig::default(),
            },
        )
    }

    #[tokio::test]
    async fn append_respects_optimistic_version() {
        let store = InMemoryEventStore::new();
        let key = key();
        store.append_events(&key, &[started(1)], 0).await.unwrap();
        let err = store.append_events(&key, &[started(2)], 0).await.unwrap_err();
        assert!(matches!(err, EngineError::OptimisticLock { .. }));
        store.append_events(&key, &[started(2)], 1).await.unwrap();
        let events = store.get_all_events(&key).await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn mutable_state_not_found_before_creation() {
        let store = InMemoryMutableStateStore::new();
        let err = store.get_mutable_state(&key()).await.unwrap_err();
        assert!(matches!(err, EngineError::ExecutionNotFound(_)));
    }
}
