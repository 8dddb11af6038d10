//! The Frontend / Dispatcher (spec.md §4.3): consumes `JobPayload`s off
//! a partitioned external work stream, translates them into
//! `ExecutionStarted` calls against History, retries with bounded
//! exponential backoff, and routes exhausted jobs to a DLQ stream. Also
//! serves the RPC facade (Signal/Terminate/Query/Describe/List) that
//! sits directly in front of History/Matching for callers that don't
//! speak the internal RPC surface.

pub mod callback;
pub mod config;
pub mod facade;
pub mod history_client;
pub mod job;
pub mod stream;

pub use config::Config;
pub use history_client::HistoryClient;
pub use job::JobPayload;
pub use stream::StreamConsumer;
