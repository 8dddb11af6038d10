//! `MutableState` — the materialized projection of a run's events, and
//! the deterministic `apply` rule that both the live executor and
//! `Replay` drive events through (spec.md §3, §4.1).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::event::{EventAttributes, HistoryEvent, TimeoutConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Terminated,
    TimedOut,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ExecutionInfo {
    pub workflow_type: String,
    pub task_queue: String,
    pub input: serde_json::Value,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
    pub timeout_config: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NodeInfo {
    pub node_id: String,
    pub node_type: String,
    pub scheduled_event_id: u64,
    pub attempt: u32,
    pub input: serde_json::Value,
    pub options: crate::node::NodeOptions,
    pub task_queue: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TimerInfo {
    pub timer_id: String,
    pub started_event_id: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NodeResult {
    pub node_id: String,
    pub result: serde_json::Value,
}

/// The in-memory projection of a run's events. Mutated only by the
/// owning shard's single writer path; readers clone before returning
/// (per the locking discipline in spec.md §5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MutableState {
    pub info: Option<ExecutionInfo>,
    pub next_event_id: u64,
    pub pending_nodes: HashMap<u64, NodeInfo>,
    pub pending_timers: HashMap<String, TimerInfo>,
    pub completed_nodes: HashMap<String, NodeResult>,
    pub buffered_events: Vec<HistoryEvent>,
    /// Optimistic-concurrency version; bumped by one on every successful
    /// `AppendEvents` + `UpdateMutableState` pair.
    pub db_version: i64,
}

impl Default for MutableState {
    fn default() -> Self {
        Self {
            info: None,
            next_event_id: 1,
            pending_nodes: HashMap::new(),
            pending_timers: HashMap::new(),
            completed_nodes: HashMap::new(),
            buffered_events: Vec::new(),
            db_version: 0,
        }
    }
}

impl MutableState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<ExecutionStatus> {
        self.info.as_ref().map(|i| i.status)
    }

    /// Validate the type-specific preconditions for `event` against the
    /// current state (spec.md §4.1 "Validators"), without mutating.
    pub fn validate(&self, event: &EventAttributes) -> Result<()> {
        match event {
            EventAttributes::ExecutionStarted { .. } => {
                if self.info.is_some() {
                    return Err(EngineError::InvalidEvent(
                        "ExecutionStarted on an already-started execution".into(),
                    ));
                }
            }
            EventAttributes::TimerStarted { timer_id, .. } => {
                if self.pending_timers.contains_key(timer_id) {
                    return Err(EngineError::DuplicateTimer(timer_id.clone()));
                }
            }
            EventAttributes::TimerFired { timer_id } | EventAttributes::TimerCanceled { timer_id } => {
                if !self.pending_timers.contains_key(timer_id) {
                    return Err(EngineError::TimerNotFound(timer_id.clone()));
                }
            }
            EventAttributes::NodeStarted { scheduled_event_id, .. }
            | EventAttributes::NodeCompleted { scheduled_event_id, .. }
            | EventAttributes::NodeFailed { scheduled_event_id, .. }
            | EventAttributes::NodeTimedOut { scheduled_event_id, .. }
            | EventAttributes::NodeCancelled { scheduled_event_id, .. } => {
                if !self.pending_nodes.contains_key(scheduled_event_id) {
                    return Err(EngineError::ActivityNotFound(*scheduled_event_id));
                }
            }
            _ => {}
        }

        if event.is_terminal() {
            match self.status() {
                Some(ExecutionStatus::Running) => {}
                Some(other) => {
                    return Err(EngineError::WorkflowNotRunning(format!("{other:?}")));
                }
                None => {
                    return Err(EngineError::WorkflowNotRunning("not started".into()));
                }
            }
        }
        Ok(())
    }

    /// Apply `event` to the state. Callers must have already validated
    /// it and assigned `event.event_id == self.next_event_id`.
    pub fn apply(&mut self, event: &HistoryEvent) {
        match &event.attributes {
            EventAttributes::ExecutionStarted {
                workflow_type,
                task_queue,
                input,
                timeout_config,
            } => {
                self.info = Some(ExecutionInfo {
                    workflow_type: workflow_type.clone(),
                    task_queue: task_queue.clone(),
                    input: input.clone(),
                    status: ExecutionStatus::Running,
                    start_time: event.timestamp,
                    close_time: None,
                    timeout_config: timeout_config.clone(),
                });
            }
            EventAttributes::ExecutionCompleted { .. } => self.close(ExecutionStatus::Completed, event.timestamp),
            EventAttributes::ExecutionFailed { .. } => self.close(ExecutionStatus::Failed, event.timestamp),
            EventAttributes::ExecutionTerminated { .. } => self.close(ExecutionStatus::Terminated, event.timestamp),
            EventAttributes::ExecutionTimedOut { .. } => self.close(ExecutionStatus::TimedOut, event.timestamp),

            EventAttributes::NodeScheduled {
                node_id,
                node_type,
                input,
                options,
                task_queue,
                attempt,
            } => {
                self.pending_nodes.insert(
                    event.event_id,
                    NodeInfo {
                        node_id: node_id.clone(),
                        node_type: node_type.clone(),
                        scheduled_event_id: event.event_id,
                        attempt: *attempt,
                        input: input.clone(),
                        options: options.clone(),
                        task_queue: task_queue.clone(),
                    },
                );
            }
            EventAttributes::NodeStarted { scheduled_event_id, attempt, .. } => {
                if let Some(info) = self.pending_nodes.get_mut(scheduled_event_id) {
                    info.attempt = *attempt;
                }
            }
            EventAttributes::NodeCompleted { scheduled_event_id, result } => {
                if let Some(info) = self.pending_nodes.remove(scheduled_event_id) {
                    self.completed_nodes.insert(
                        info.node_id.clone(),
                        NodeResult {
                            node_id: info.node_id,
                            result: result.clone(),
                        },
                    );
                }
            }
            EventAttributes::NodeFailed { scheduled_event_id, .. } => {
                // Whether or not this retries, the scheduled_event_id this
                // attempt was keyed under is resolved: a retry re-schedules
                // under a fresh scheduled_event_id (a new pending_nodes
                // entry), it does not keep this one outstanding.
                self.pending_nodes.remove(scheduled_event_id);
            }
            EventAttributes::NodeTimedOut { scheduled_event_id, .. }
            | EventAttributes::NodeCancelled { scheduled_event_id, .. } => {
                self.pending_nodes.remove(scheduled_event_id);
            }

            EventAttributes::TimerStarted { timer_id, duration_ms } => {
                self.pending_timers.insert(
                    timer_id.clone(),
                    TimerInfo {
                        timer_id: timer_id.clone(),
                        started_event_id: event.event_id,
                        duration_ms: *duration_ms,
                    },
                );
            }
            EventAttributes::TimerFired { timer_id } | EventAttributes::TimerCanceled { timer_id } => {
                self.pending_timers.remove(timer_id);
            }

            EventAttributes::WorkflowTaskScheduled { .. }
            | EventAttributes::WorkflowTaskStarted { .. }
            | EventAttributes::WorkflowTaskCompleted { .. }
            | EventAttributes::WorkflowTaskFailed { .. }
            | EventAttributes::SignalReceived { .. }
            | EventAttributes::Marker { .. } => {
                // No aggregate-map mutation; these events exist for replay
                // fidelity and are observed by the decider directly.
            }
        }
        self.next_event_id = event.event_id + 1;
    }

    fn close(&mut self, status: ExecutionStatus, at: DateTime<Utc>) {
        if let Some(info) = &mut self.info {
            info.status = status;
            info.close_time = Some(at);
        }
    }
}

/// Rebuilds `MutableState` by applying `events` sequentially from event
/// 1 (spec.md §4.1 "Replay"). Does not validate — callers that need
/// validation should run [`MutableState::validate`] per event, or call
/// [`crate::event::validate_history_integrity`] up front.
pub fn replay(events: &[HistoryEvent]) -> MutableState {
    let mut state = MutableState::new();
    for event in events {
        state.apply(event);
    }
    state
}

/// The equivalence relation `Replay` compares against: `{NextEventID,
/// |pendingActivities|, |pendingTimers|}` (spec.md §4.1, §8 "Replay
/// fidelity").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayFingerprint {
    pub next_event_id: u64,
    pub pending_node_count: usize,
    pub pending_timer_count: usize,
}

impl MutableState {
    pub fn replay_fingerprint(&self) -> ReplayFingerprint {
        ReplayFingerprint {
            next_event_id: self.next_event_id,
            pending_node_count: self.pending_nodes.len(),
            pending_timer_count: self.pending_timers.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ev(id: u64, attrs: EventAttributes) -> HistoryEvent {
        HistoryEvent::new(id, id as i64, attrs)
    }

    #[test]
    fn started_then_node_scheduled_then_completed() {
        let mut state = MutableState::new();
        state.apply(&ev(
            1,
            EventAttributes::ExecutionStarted {
                workflow_type: "wf".into(),
                task_queue: "q".into(),
                input: json!({}),
                timeout_config: TimeoutConfig::default(),
            },
        ));
        assert_eq!(state.status(), Some(ExecutionStatus::Running));

        state.apply(&ev(
            2,
            EventAttributes::NodeScheduled {
                node_id: "n1".into(),
                node_type: "http".into(),
                input: json!({}),
                options: crate::node::NodeOptions::default(),
                task_queue: "q".into(),
                attempt: 1,
            },
        ));
        assert!(state.pending_nodes.contains_key(&2));

        state.apply(&ev(
            3,
            EventAttributes::NodeCompleted {
                scheduled_event_id: 2,
                result: json!({"ok": true}),
            },
        ));
        assert!(!state.pending_nodes.contains_key(&2));
        assert!(state.completed_nodes.contains_key("n1"));
        assert_eq!(state.next_event_id, 4);
    }

    #[test]
    fn validate_rejects_unknown_scheduled_event_id() {
        let state = MutableState::new();
        let result = state.validate(&EventAttributes::NodeCompleted {
            scheduled_event_id: 99,
            result: json!({}),
        });
        assert!(matches!(result, Err(EngineError::ActivityNotFound(99))));
    }

    #[test]
    fn validate_rejects_duplicate_timer() {
        let mut state = MutableState::new();
        state.apply(&ev(
            1,
            EventAttributes::TimerStarted {
                timer_id: "t1".into(),
                duration_ms: 1000,
            },
        ));
        let result = state.validate(&EventAttributes::TimerStarted {
            timer_id: "t1".into(),
            duration_ms: 1000,
        });
        assert!(matches!(result, Err(EngineError::DuplicateTimer(_))));
    }

    #[test]
    fn replay_fingerprint_matches_live_apply() {
        let events = vec![
            ev(
                1,
                EventAttributes::ExecutionStarted {
                    workflow_type: "wf".into(),
                    task_queue: "q".into(),
                    input: json!({}),
                    timeout_config: TimeoutConfig::default(),
                },
            ),
            ev(2, EventAttributes::ExecutionCompleted { result: json!({}) }),
        ];
        let replayed = replay(&events);
        let mut live = MutableState::new();
        for event in &events {
            live.apply(event);
        }
        assert_eq!(replayed.replay_fingerprint(), live.replay_fingerprint());
    }
}
