//! # Matching service
//!
//! Holds pending tasks per queue, dispatches them to pollers fairly
//! and with backpressure, guarantees at-least-once delivery under
//! leases, and survives crashes via a write-ahead log (spec.md §4.2).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MatchingGrpcService                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MatchingManager                         │
//! │        (partition ring, lazy per-queue TaskQueue map)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┬───────────────┐
//!              ▼               ▼               ▼               ▼
//!          TaskStore     Backpressure     RateLimiter      StickyAffinity
//!    (in-memory/Redis)                                        + WAL + DLQ
//! ```

pub mod backpressure;
pub mod config;
pub mod dlq;
pub mod grpc;
pub mod manager;
pub mod metrics;
pub mod partition;
pub mod queue;
pub mod rate_limiter;
pub mod sticky;
pub mod store;
pub mod wal;

pub use grpc::MatchingGrpcService;
pub use manager::MatchingManager;
pub use queue::{TaskQueue, TaskQueueConfig};
