//! The append-only history event log.
//!
//! `HistoryEvent` wraps a discriminated `EventAttributes` union — the
//! systems-language replacement for the untyped `any` the source system
//! used for event attributes (see the re-architecture notes). Every
//! variant owns exactly the fields that event type needs; `apply`/
//! `validate` switch on the tag rather than probing an untyped map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::node::{NodeError, NodeOptions};
use crate::signal::WorkflowSignal;
use crate::workflow_error::WorkflowError;

/// Types of timeouts that can occur against a node or an execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum TimeoutType {
    /// Node was not claimed within `schedule_to_start` timeout.
    ScheduleToStart,
    /// Node did not complete within `start_to_close` timeout.
    StartToClose,
    /// Worker did not heartbeat within the configured heartbeat timeout.
    Heartbeat,
}

/// Per-execution timeout budget, carried on `ExecutionStarted`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TimeoutConfig {
    #[serde(with = "crate::duration_millis")]
    pub schedule_to_start: std::time::Duration,
    #[serde(with = "crate::duration_millis")]
    pub start_to_close: std::time::Duration,
    #[serde(with = "crate::option_duration_millis")]
    pub heartbeat: Option<std::time::Duration>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            schedule_to_start: std::time::Duration::from_secs(60),
            start_to_close: std::time::Duration::from_secs(300),
            heartbeat: None,
        }
    }
}

fn default_node_attempt() -> u32 {
    1
}

/// The discriminated attribute union. One canonical shape per event
/// type — the source carried both a typed and a proto-wrapped
/// `ExecutionStartedAttributes`; this is the single layout chosen here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EventAttributes {
    // --- Execution lifecycle ---
    ExecutionStarted {
        workflow_type: String,
        task_queue: String,
        input: serde_json::Value,
        timeout_config: TimeoutConfig,
    },
    ExecutionCompleted {
        result: serde_json::Value,
    },
    ExecutionFailed {
        error: WorkflowError,
    },
    ExecutionTerminated {
        reason: String,
        identity: String,
    },
    ExecutionTimedOut {
        timeout_type: TimeoutType,
    },

    // --- Node lifecycle ---
    NodeScheduled {
        node_id: String,
        node_type: String,
        input: serde_json::Value,
        options: NodeOptions,
        task_queue: String,
        /// 1 for the initial schedule; bumped on each `RetryPolicy`-driven
        /// re-schedule after a retryable `NodeFailed`.
        #[serde(default = "default_node_attempt")]
        attempt: u32,
    },
    NodeStarted {
        scheduled_event_id: u64,
        attempt: u32,
        worker_identity: String,
    },
    NodeCompleted {
        scheduled_event_id: u64,
        result: serde_json::Value,
    },
    NodeFailed {
        scheduled_event_id: u64,
        error: NodeError,
        will_retry: bool,
    },
    NodeTimedOut {
        scheduled_event_id: u64,
        timeout_type: TimeoutType,
    },
    NodeCancelled {
        scheduled_event_id: u64,
        reason: String,
    },

    // --- Timer lifecycle ---
    TimerStarted {
        timer_id: String,
        duration_ms: u64,
    },
    TimerFired {
        timer_id: String,
    },
    TimerCanceled {
        timer_id: String,
    },

    // --- Workflow-task lifecycle (the decider's own invocation) ---
    WorkflowTaskScheduled {
        task_queue: String,
    },
    WorkflowTaskStarted {
        scheduled_event_id: u64,
        worker_identity: String,
    },
    WorkflowTaskCompleted {
        scheduled_event_id: u64,
    },
    WorkflowTaskFailed {
        scheduled_event_id: u64,
        error: WorkflowError,
        attempt: u32,
    },

    // --- Signals ---
    SignalReceived {
        signal: WorkflowSignal,
    },

    // --- Markers (opaque side-effect records, e.g. recorded random values) ---
    Marker {
        marker_id: String,
        details: serde_json::Value,
    },
}

impl EventAttributes {
    /// The `eventType` string used in logs, metrics, and the visibility
    /// store — matches the serde tag value.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ExecutionStarted { .. } => "execution_started",
            Self::ExecutionCompleted { .. } => "execution_completed",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::ExecutionTerminated { .. } => "execution_terminated",
            Self::ExecutionTimedOut { .. } => "execution_timed_out",
            Self::NodeScheduled { .. } => "node_scheduled",
            Self::NodeStarted { .. } => "node_started",
            Self::NodeCompleted { .. } => "node_completed",
            Self::NodeFailed { .. } => "node_failed",
            Self::NodeTimedOut { .. } => "node_timed_out",
            Self::NodeCancelled { .. } => "node_cancelled",
            Self::TimerStarted { .. } => "timer_started",
            Self::TimerFired { .. } => "timer_fired",
            Self::TimerCanceled { .. } => "timer_canceled",
            Self::WorkflowTaskScheduled { .. } => "workflow_task_scheduled",
            Self::WorkflowTaskStarted { .. } => "workflow_task_started",
            Self::WorkflowTaskCompleted { .. } => "workflow_task_completed",
            Self::WorkflowTaskFailed { .. } => "workflow_task_failed",
            Self::SignalReceived { .. } => "signal_received",
            Self::Marker { .. } => "marker",
        }
    }

    /// True for events that may appear only as the last event of a run
    /// (the terminal-last invariant).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ExecutionCompleted { .. }
                | Self::ExecutionFailed { .. }
                | Self::ExecutionTerminated { .. }
                | Self::ExecutionTimedOut { .. }
        )
    }

    /// The `scheduledEventID` this event refers back to, for node and
    /// workflow-task lifecycle events. `None` for events with no such
    /// reference (e.g. `ExecutionStarted`, timers, signals).
    pub fn scheduled_event_id(&self) -> Option<u64> {
        match self {
            Self::NodeStarted { scheduled_event_id, .. }
            | Self::NodeCompleted { scheduled_event_id, .. }
            | Self::NodeFailed { scheduled_event_id, .. }
            | Self::NodeTimedOut { scheduled_event_id, .. }
            | Self::NodeCancelled { scheduled_event_id, .. }
            | Self::WorkflowTaskStarted { scheduled_event_id, .. }
            | Self::WorkflowTaskCompleted { scheduled_event_id, .. }
            | Self::WorkflowTaskFailed { scheduled_event_id, .. } => Some(*scheduled_event_id),
            _ => None,
        }
    }
}

/// An immutable, ordered record appended to an execution. `event_id`
/// values within a run form the gap-free sequence `1, 2, …`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HistoryEvent {
    pub event_id: u64,
    pub timestamp: DateTime<Utc>,
    /// Monotonic store version this event was appended under. Equal to
    /// `MutableState.db_version` at append time.
    pub version: i64,
    /// Opaque task token this event was produced in response to, if any
    /// (e.g. the `RespondActivityTaskCompleted` call that produced it).
    pub task_id: Option<String>,
    pub attributes: EventAttributes,
}

impl HistoryEvent {
    pub fn new(event_id: u64, version: i64, attributes: EventAttributes) -> Self {
        Self {
            event_id,
            timestamp: Utc::now(),
            version,
            task_id: None,
            attributes,
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn event_type(&self) -> &'static str {
        self.attributes.event_type()
    }

    pub fn is_terminal(&self) -> bool {
        self.attributes.is_terminal()
    }
}

/// Validates the contiguous-events and first-event invariants for a
/// full event slice starting at event 1. Used by
/// `ValidateHistoryIntegrity` and by tests asserting the quantified
/// invariants from the testable-properties section.
pub fn validate_history_integrity(events: &[HistoryEvent]) -> Result<()> {
    if events.is_empty() {
        return Ok(());
    }
    if !matches!(events[0].attributes, EventAttributes::ExecutionStarted { .. }) {
        return Err(EngineError::InvalidEvent(
            "first event must be ExecutionStarted".into(),
        ));
    }
    for (i, event) in events.iter().enumerate() {
        let expected = (i as u64) + 1;
        if event.event_id != expected {
            return Err(EngineError::EventOutOfOrder {
                expected,
                actual: event.event_id,
            });
        }
        let is_last = i == events.len() - 1;
        if event.is_terminal() && !is_last {
            return Err(EngineError::BranchDiverged(format!(
                "terminal event {} found before end of history (event_id={})",
                event.event_type(),
                event.event_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn execution_started_serializes_with_snake_case_tag() {
        let event = EventAttributes::ExecutionStarted {
            workflow_type: "order_flow".into(),
            task_queue: "workflows-default".into(),
            input: json!({"order_id": "123"}),
            timeout_config: TimeoutConfig::default(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"execution_started\""));
        let parsed: EventAttributes = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn scheduled_event_id_extraction() {
        let event = EventAttributes::NodeStarted {
            scheduled_event_id: 4,
            attempt: 1,
            worker_identity: "worker-1".into(),
        };
        assert_eq!(event.scheduled_event_id(), Some(4));
        let start = EventAttributes::ExecutionStarted {
            workflow_type: "x".into(),
            task_queue: "q".into(),
            input: json!({}),
            timeout_config: TimeoutConfig::default(),
        };
        assert_eq!(start.scheduled_event_id(), None);
    }

    #[test]
    fn is_terminal_covers_all_four_terminal_variants() {
        assert!(EventAttributes::ExecutionCompleted { result: json!({}) }.is_terminal());
        assert!(EventAttributes::ExecutionFailed {
            error: WorkflowError::new("boom")
        }
        .is_terminal());
        assert!(EventAttributes::ExecutionTerminated {
            reason: "admin".into(),
            identity: "op".into()
        }
        .is_terminal());
        assert!(EventAttributes::ExecutionTimedOut {
            timeout_type: TimeoutType::StartToClose
        }
        .is_terminal());
        assert!(!EventAttributes::WorkflowTaskScheduled {
            task_queue: "q".into()
        }
        .is_terminal());
    }

    fn started(id: u64) -> HistoryEvent {
        HistoryEvent::new(
            id,
            id as i64,
            EventAttributes::ExecutionStarted {
                workflow_type: "x".into(),
                task_queue: "q".into(),
                input: json!({}),
                timeout_config: TimeoutConfig::default(),
            },
        )
    }

    fn completed(id: u64) -> HistoryEvent {
        HistoryEvent::new(
            id,
            id as i64,
            EventAttributes::ExecutionCompleted { result: json!({}) },
        )
    }

    #[test]
    fn contiguous_gap_free_history_validates() {
        let events = vec![started(1), completed(2)];
        assert!(validate_history_integrity(&events).is_ok());
    }

    #[test]
    fn gap_in_event_ids_is_rejected() {
        let mut events = vec![started(1)];
        let mut bad = completed(2);
        bad.event_id = 3;
        events.push(bad);
        assert!(validate_history_integrity(&events).is_err());
    }

    #[test]
    fn terminal_event_mid_history_is_rejected() {
        let events = vec![started(1), completed(2), started(3)];
        assert!(validate_history_integrity(&events).is_err());
    }

    #[test]
    fn first_event_must_be_execution_started() {
        let events = vec![completed(1)];
        assert!(validate_history_integrity(&events).is_err());
    }
}
