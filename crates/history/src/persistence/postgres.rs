//! PostgreSQL implementations of the persistence contracts.
//!
//! Events and mutable-state snapshots are stored as JSONB: `HistoryEvent`
//! and `MutableState` already round-trip through `serde_json` (every
//! wire/persistence boundary in this workspace uses that format, per
//! `linkflow-types`), so there is no separate relational schema to keep in
//! sync with every new event-attribute variant.
//!
//! Schema (see `migrations/`):
//! ```sql
//! CREATE TABLE history_events (
//!     namespace_id TEXT NOT NULL,
//!     workflow_id  TEXT NOT NULL,
//!     run_id       TEXT NOT NULL,
//!     event_id     BIGINT NOT NULL,
//!     event        JSONB NOT NULL,
//!     PRIMARY KEY (namespace_id, workflow_id, run_id, event_id)
//! );
//!
//! CREATE TABLE mutable_state (
//!     namespace_id TEXT NOT NULL,
//!     workflow_id  TEXT NOT NULL,
//!     run_id       TEXT NOT NULL,
//!     state        JSONB NOT NULL,
//!     db_version   BIGINT NOT NULL,
//!     PRIMARY KEY (namespace_id, workflow_id, run_id)
//! );
//!
//! CREATE TABLE visibility (
//!     namespace_id TEXT NOT NULL,
//!     workflow_id  TEXT NOT NULL,
//!     run_id       TEXT NOT NULL,
//!     workflow_type TEXT NOT NULL,
//!     status        TEXT NOT NULL,
//!     start_time    TIMESTAMPTZ NOT NULL,
//!     close_time    TIMESTAMPTZ,
//!     PRIMARY KEY (namespace_id, workflow_id, run_id)
//! );
//!
//! CREATE TABLE state_snapshots (
//!     namespace_id TEXT NOT NULL,
//!     workflow_id  TEXT NOT NULL,
//!     run_id       TEXT NOT NULL,
//!     at_event_id  BIGINT NOT NULL,
//!     state        JSONB NOT NULL,
//!     PRIMARY KEY (namespace_id, workflow_id, run_id)
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

use linkflow_types::{EngineError, ExecutionKey, HistoryEvent, MutableState, Result};

use super::store::{
    map_sqlx_error, EventStore, MutableStateStore, SnapshotStore, VisibilityRecord, VisibilityStore,
};

#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[instrument(skip(self, events))]
    async fn append_events(
        &self,
        key: &ExecutionKey,
        events: &[HistoryEvent],
        expected_version: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Lock the mutable-state row and check the optimistic version
        // before inserting events, so a losing writer never partially
        // appends (spec.md §4.1 step 4-5).
        let row = sqlx::query(
            r#"SELECT db_version FROM mutable_state
               WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3
               FOR UPDATE"#,
        )
        .bind(&key.namespace_id)
        .bind(&key.workflow_id)
        .bind(&key.run_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let current_version = row.map(|r| r.get::<i64, _>("db_version")).unwrap_or(0);
        if current_version != expected_version {
            return Err(EngineError::OptimisticLock {
                expected: expected_version,
                actual: current_version,
            });
        }

        for event in events {
            let payload = serde_json::to_value(event).map_err(|e| EngineError::Store(e.to_string()))?;
            sqlx::query(
                r#"INSERT INTO history_events (namespace_id, workflow_id, run_id, event_id, event)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(&key.namespace_id)
            .bind(&key.workflow_id)
            .bind(&key.run_id)
            .bind(event.event_id as i64)
            .bind(&payload)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(%key, count = events.len(), "appended events");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_events(
        &self,
        key: &ExecutionKey,
        first_event_id: u64,
        last_event_id: u64,
    ) -> Result<Vec<HistoryEvent>> {
        let rows = sqlx::query(
            r#"SELECT event FROM history_events
               WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3
                 AND event_id >= $4 AND event_id <= $5
               ORDER BY event_id ASC"#,
        )
        .bind(&key.namespace_id)
        .bind(&key.workflow_id)
        .bind(&key.run_id)
        .bind(first_event_id as i64)
        .bind(last_event_id.min(i64::MAX as u64) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let value: serde_json::Value = row.get("event");
                serde_json::from_value(value).map_err(|e| EngineError::Store(e.to_string()))
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct PostgresMutableStateStore {
    pool: PgPool,
}

impl PostgresMutableStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MutableStateStore for PostgresMutableStateStore {
    #[instrument(skip(self))]
    async fn get_mutable_state(&self, key: &ExecutionKey) -> Result<MutableState> {
        let row = sqlx::query(
            r#"SELECT state FROM mutable_state
               WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3"#,
        )
        .bind(&key.namespace_id)
        .bind(&key.workflow_id)
        .bind(&key.run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| EngineError::ExecutionNotFound(key.clone()))?;

        let value: serde_json::Value = row.get("state");
        serde_json::from_value(value).map_err(|e| EngineError::Store(e.to_string()))
    }

    #[instrument(skip(self, state))]
    async fn update_mutable_state(
        &self,
        key: &ExecutionKey,
        state: &MutableState,
        expected_version: i64,
    ) -> Result<()> {
        let payload = serde_json::to_value(state).map_err(|e| EngineError::Store(e.to_string()))?;
        let result = sqlx::query(
            r#"UPDATE mutable_state SET state = $1, db_version = $2
               WHERE namespace_id = $3 AND workflow_id = $4 AND run_id = $5 AND db_version = $6"#,
        )
        .bind(&payload)
        .bind(state.db_version)
        .bind(&key.namespace_id)
        .bind(&key.workflow_id)
        .bind(&key.run_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(EngineError::OptimisticLock {
                expected: expected_version,
                actual: state.db_version,
            });
        }
        Ok(())
    }

    #[instrument(skip(self, state))]
    async fn create_mutable_state(&self, key: &ExecutionKey, state: &MutableState) -> Result<()> {
        let payload = serde_json::to_value(state).map_err(|e| EngineError::Store(e.to_string()))?;
        sqlx::query(
            r#"INSERT INTO mutable_state (namespace_id, workflow_id, run_id, state, db_version)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&key.namespace_id)
        .bind(&key.workflow_id)
        .bind(&key.run_id)
        .bind(&payload)
        .bind(state.db_version)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PostgresVisibilityStore {
    pool: PgPool,
}

impl PostgresVisibilityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisibilityStore for PostgresVisibilityStore {
    async fn record_started(&self, record: VisibilityRecord) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO visibility (namespace_id, workflow_id, run_id, workflow_type, status, start_time, close_time)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (namespace_id, workflow_id, run_id) DO NOTHING"#,
        )
        .bind(&record.key.namespace_id)
        .bind(&record.key.workflow_id)
        .bind(&record.key.run_id)
        .bind(&record.workflow_type)
        .bind(&record.status)
        .bind(record.start_time)
        .bind(record.close_time)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn record_closed(
        &self,
        key: &ExecutionKey,
        status: String,
        close_time: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE visibility SET status = $1, close_time = $2
               WHERE namespace_id = $3 AND workflow_id = $4 AND run_id = $5"#,
        )
        .bind(&status)
        .bind(close_time)
        .bind(&key.namespace_id)
        .bind(&key.workflow_id)
        .bind(&key.run_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_open(&self, namespace_id: &str, page_size: usize) -> Result<Vec<VisibilityRecord>> {
        let rows = sqlx::query(
            r#"SELECT namespace_id, workflow_id, run_id, workflow_type, status, start_time, close_time
               FROM visibility WHERE namespace_id = $1 AND close_time IS NULL
               ORDER BY start_time DESC LIMIT $2"#,
        )
        .bind(namespace_id)
        .bind(page_size as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(row_to_visibility_record).collect())
    }

    async fn list_closed(&self, namespace_id: &str, page_size: usize) -> Result<Vec<VisibilityRecord>> {
        let rows = sqlx::query(
            r#"SELECT namespace_id, workflow_id, run_id, workflow_type, status, start_time, close_time
               FROM visibility WHERE namespace_id = $1 AND close_time IS NOT NULL
               ORDER BY close_time DESC LIMIT $2"#,
        )
        .bind(namespace_id)
        .bind(page_size as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(row_to_visibility_record).collect())
    }
}

fn row_to_visibility_record(row: sqlx::postgres::PgRow) -> VisibilityRecord {
    VisibilityRecord {
        key: ExecutionKey::new(
            row.get::<String, _>("namespace_id"),
            row.get::<String, _>("workflow_id"),
            row.get::<String, _>("run_id"),
        ),
        workflow_type: row.get("workflow_type"),
        status: row.get("status"),
        start_time: row.get("start_time"),
        close_time: row.get("close_time"),
    }
}

#[derive(Clone)]
pub struct PostgresSnapshotStore {
    pool: PgPool,
}

impl PostgresSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PostgresSnapshotStore {
    async fn save_snapshot(&self, key: &ExecutionKey, at_event_id: u64, state: &MutableState) -> Result<()> {
        let payload = serde_json::to_value(state).map_err(|e| EngineError::Store(e.to_string()))?;
        sqlx::query(
            r#"INSERT INTO state_snapshots (namespace_id, workflow_id, run_id, at_event_id, state)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (namespace_id, workflow_id, run_id)
               DO UPDATE SET at_event_id = EXCLUDED.at_event_id, state = EXCLUDED.state"#,
        )
        .bind(&key.namespace_id)
        .bind(&key.workflow_id)
        .bind(&key.run_id)
        .bind(at_event_id as i64)
        .bind(&payload)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_latest_snapshot(&self, key: &ExecutionKey) -> Result<Option<(u64, MutableState)>> {
        let row = sqlx::query(
            r#"SELECT at_event_id, state FROM state_snapshots
               WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3"#,
        )
        .bind(&key.namespace_id)
        .bind(&key.workflow_id)
        .bind(&key.run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => {
                let at_event_id: i64 = row.get("at_event_id");
                let value: serde_json::Value = row.get("state");
                let state = serde_json::from_value(value).map_err(|e| EngineError::Store(e.to_string()))?;
                Ok(Some((at_event_id as u64, state)))
            }
            None => Ok(None),
        }
    }

    async fn delete_snapshots(&self, key: &ExecutionKey) -> Result<()> {
        sqlx::query(
            r#"DELETE FROM state_snapshots WHERE namespace_id = $1 AND workflow_id = $2 AND run_id = $3"#,
        )
        .bind(&key.namespace_id)
        .bind(&key.workflow_id)
        .bind(&key.run_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}
