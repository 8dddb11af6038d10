//! # LinkFlow Types
//!
//! The data model shared by every crate in the engine cluster: the
//! execution key and shard routing, the history-event tagged union and
//! its deterministic `apply` rule, the task/queue descriptors Matching
//! dispatches, the namespace and cluster entities Control Plane owns,
//! and the error taxonomy every other crate propagates.
//!
//! Nothing here performs I/O; every type round-trips through
//! `serde_json` (the wire format every persistence and RPC boundary in
//! this workspace uses for event/task payloads).

pub mod action;
pub mod cluster;
pub mod error;
pub mod event;
pub mod key;
pub mod namespace;
pub mod node;
pub mod retry;
pub mod signal;
pub mod state;
pub mod task;
pub mod workflow_error;

pub use action::WorkflowCommand;
pub use cluster::{ClusterInfo, ClusterStatus, PeerCluster};
pub use error::{EngineError, ErrorCategory, Result};
pub use event::{EventAttributes, HistoryEvent, TimeoutConfig, TimeoutType};
pub use key::{shard_id, ExecutionKey, DEFAULT_SHARD_COUNT};
pub use namespace::Namespace;
pub use node::{NodeError, NodeOptions};
pub use retry::{frontend_retry_delay, linear_delay, RetryPolicy};
pub use signal::{signal_types, WorkflowSignal};
pub use state::{ExecutionInfo, ExecutionStatus, MutableState, NodeInfo, NodeResult, ReplayFingerprint, TimerInfo};
pub use task::{deterministic_task_id, Task, TaskToken, TaskType};
pub use workflow_error::WorkflowError;

/// Serde support for `Duration` as milliseconds, shared by every struct
/// in this crate that carries a wire-visible timeout or interval.
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

pub(crate) mod option_duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_millis()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
