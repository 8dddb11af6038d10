//! Commands a decider returns from `RespondWorkflowTaskCompleted`.
//!
//! History applies each command atomically under one version bump
//! (spec.md §4.1): a `ScheduleNode` command emits `NodeScheduled` and an
//! `AddTask` call to Matching; `Complete`/`Fail` emit the run's
//! terminal event.

use serde::{Deserialize, Serialize};

use crate::node::NodeOptions;
use crate::workflow_error::WorkflowError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum WorkflowCommand {
    ScheduleNode {
        node_id: String,
        node_type: String,
        input: serde_json::Value,
        options: NodeOptions,
    },
    StartTimer {
        timer_id: String,
        duration_ms: u64,
    },
    CancelTimer {
        timer_id: String,
    },
    CancelNode {
        scheduled_event_id: u64,
        reason: String,
    },
    CompleteExecution {
        result: serde_json::Value,
    },
    FailExecution {
        error: WorkflowError,
    },
    /// The decider produced no new commands this pass (e.g. it is
    /// waiting on outstanding nodes or timers).
    None,
}

impl WorkflowCommand {
    pub fn schedule_node(
        node_id: impl Into<String>,
        node_type: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self::ScheduleNode {
            node_id: node_id.into(),
            node_type: node_type.into(),
            input,
            options: NodeOptions::default(),
        }
    }

    pub fn complete(result: serde_json::Value) -> Self {
        Self::CompleteExecution { result }
    }

    pub fn fail(error: WorkflowError) -> Self {
        Self::FailExecution { error }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CompleteExecution { .. } | Self::FailExecution { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schedule_node_helper_fills_default_options() {
        let cmd = WorkflowCommand::schedule_node("n1", "http_call", json!({}));
        match cmd {
            WorkflowCommand::ScheduleNode { node_id, node_type, .. } => {
                assert_eq!(node_id, "n1");
                assert_eq!(node_type, "http_call");
            }
            _ => panic!("expected ScheduleNode"),
        }
    }

    #[test]
    fn complete_and_fail_are_terminal() {
        assert!(WorkflowCommand::complete(json!({})).is_terminal());
        assert!(WorkflowCommand::fail(WorkflowError::new("x")).is_terminal());
        assert!(!WorkflowCommand::None.is_terminal());
    }
}
