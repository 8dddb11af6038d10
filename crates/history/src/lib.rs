//! # History service
//!
//! The single writer for an execution (spec.md §4.1): event-sourced
//! state store, shard ownership, optimistic concurrency, replay and
//! integrity validation, and the task-emission rules that hand
//! scheduling-triggering events off to Matching.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       HistoryGrpcService                      │
//! │        (tonic wiring, error-category -> gRPC status)         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        HistoryEngine                         │
//! │   (RecordEvent, GetHistory, RespondWorkflowTaskCompleted,    │
//! │    RespondActivityTaskCompleted|Failed, ResetExecution)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!              ▼               ▼               ▼
//!        EventStore    MutableStateStore  VisibilityStore
//!     (in-memory/Postgres, behind a ShardController)
//! ```

pub mod config;
pub mod engine;
pub mod grpc;
pub mod persistence;
pub mod registry;
pub mod reliability;
pub mod replay;
pub mod shard;
pub mod task_dispatch;

pub use engine::HistoryEngine;
pub use grpc::HistoryGrpcService;
pub use shard::{Shard, ShardController};
