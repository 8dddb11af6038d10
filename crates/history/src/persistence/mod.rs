//! Persistence layer for the History service (spec.md §6).
//!
//! Four narrow traits — events, mutable state, visibility, snapshots —
//! each with an in-memory implementation for tests and a Postgres
//! implementation for production.

mod memory;
mod postgres;
mod store;

pub use memory::{
    InMemoryEventStore, InMemoryMutableStateStore, InMemorySnapshotStore, InMemoryVisibilityStore,
};
pub use postgres::{
    PostgresEventStore, PostgresMutableStateStore, PostgresSnapshotStore, PostgresVisibilityStore,
};
pub use store::{
    map_sqlx_error, EventStore, MutableStateStore, SnapshotStore, VisibilityRecord, VisibilityStore,
};
