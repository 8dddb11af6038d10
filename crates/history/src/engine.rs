//! The History service itself (spec.md §4.1): `RecordEvent`,
//! `GetHistory`, `GetMutableState`, `RespondWorkflowTaskCompleted`,
//! `RespondActivityTaskCompleted|Failed`, `ResetExecution`,
//! `ListWorkflowExecutions`.
//!
//! One call path, serialized per shard — enforced here by routing every
//! mutating call through [`ShardController::shard_for`] before touching
//! storage, then taking the optimistic-lock path described in spec.md
//! §4.1 "Core algorithm".

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use linkflow_types::{
    EngineError, EventAttributes, ExecutionKey, HistoryEvent, MutableState, NodeError, Result, Task,
    TaskType, WorkflowCommand,
};

use crate::persistence::{EventStore, MutableStateStore, VisibilityRecord, VisibilityStore};
use crate::shard::ShardController;
use crate::task_dispatch::TaskDispatcher;

pub struct HistoryEngine {
    events: Arc<dyn EventStore>,
    mutable_state: Arc<dyn MutableStateStore>,
    visibility: Arc<dyn VisibilityStore>,
    dispatcher: Arc<dyn TaskDispatcher>,
    shards: ShardController,
}

impl HistoryEngine {
    pub fn new(
        events: Arc<dyn EventStore>,
        mutable_state: Arc<dyn MutableStateStore>,
        visibility: Arc<dyn VisibilityStore>,
        dispatcher: Arc<dyn TaskDispatcher>,
        shards: ShardController,
    ) -> Self {
        Self {
            events,
            mutable_state,
            visibility,
            dispatcher,
            shards,
        }
    }

    /// `RecordEvent(key, event) -> eventID` — the single mutating entry
    /// point every other operation below funnels through.
    #[instrument(skip(self, attributes))]
    pub async fn record_event(&self, key: &ExecutionKey, attributes: EventAttributes) -> Result<u64> {
        self.shards.shard_for(key)?;

        let is_start = matches!(attributes, EventAttributes::ExecutionStarted { .. });
        let (mut state, expected_version) = if is_start {
            (MutableState::new(), 0)
        } else {
            let state = self.mutable_state.get_mutable_state(key).await?;
            let version = state.db_version;
            (state, version)
        };

        state.validate(&attributes)?;

        let event_id = state.next_event_id;
        let event = HistoryEvent::new(event_id, state.db_version, attributes);
        state.apply(&event);
        state.db_version += 1;

        self.events
            .append_events(key, std::slice::from_ref(&event), expected_version)
            .await?;

        if is_start {
            self.mutable_state.create_mutable_state(key, &state).await?;
        } else {
            self.mutable_state
                .update_mutable_state(key, &state, expected_version)
                .await?;
        }

        self.fan_out(key, &state, &event).await?;
        Ok(event_id)
    }

    /// spec.md §4.1 "Task-emission rules" plus the visibility-record
    /// side effect for lifecycle transitions.
    async fn fan_out(&self, key: &ExecutionKey, state: &MutableState, event: &HistoryEvent) -> Result<()> {
        match &event.attributes {
            EventAttributes::ExecutionStarted {
                workflow_type,
                task_queue,
                input,
                ..
            } => {
                self.visibility
                    .record_started(VisibilityRecord {
                        key: key.clone(),
                        workflow_type: workflow_type.clone(),
                        status: "running".into(),
                        start_time: event.timestamp,
                        close_time: None,
                    })
                    .await?;
                let task = Task::new(key.clone(), TaskType::WorkflowTask, event.event_id, input.clone());
                self.dispatcher.add_task(task_queue, task).await?;
            }
            EventAttributes::NodeScheduled {
                input, task_queue, ..
            } => {
                let task = Task::new(key.clone(), TaskType::ActivityTask, event.event_id, input.clone());
                self.dispatcher.add_task(task_queue, task).await?;
            }
            EventAttributes::NodeCompleted { .. } | EventAttributes::NodeFailed { .. } => {
                if let Some(info) = &state.info {
                    let task = Task::new(
                        key.clone(),
                        TaskType::WorkflowTask,
                        event.event_id,
                        serde_json::Value::Null,
                    );
                    self.dispatcher.add_task(&info.task_queue, task).await?;
                }
            }
            EventAttributes::WorkflowTaskScheduled { task_queue } => {
                let task = Task::new(
                    key.clone(),
                    TaskType::WorkflowTask,
                    event.event_id,
                    serde_json::Value::Null,
                );
                self.dispatcher.add_task(task_queue, task).await?;
            }
            EventAttributes::ExecutionCompleted { .. }
            | EventAttributes::ExecutionFailed { .. }
            | EventAttributes::ExecutionTerminated { .. }
            | EventAttributes::ExecutionTimedOut { .. } => {
                let status = match &event.attributes {
                    EventAttributes::ExecutionCompleted { .. } => "completed",
                    EventAttributes::ExecutionFailed { .. } => "failed",
                    EventAttributes::ExecutionTerminated { .. } => "terminated",
                    EventAttributes::ExecutionTimedOut { .. } => "timed_out",
                    _ => unreachable!(),
                };
                self.visibility
                    .record_closed(key, status.into(), event.timestamp)
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_history(
        &self,
        key: &ExecutionKey,
        first_event_id: u64,
        last_event_id: u64,
    ) -> Result<Vec<HistoryEvent>> {
        self.events.get_events(key, first_event_id, last_event_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_mutable_state(&self, key: &ExecutionKey) -> Result<MutableState> {
        self.mutable_state.get_mutable_state(key).await
    }

    /// `RespondWorkflowTaskCompleted(key, taskToken, commands[])` —
    /// every command in the list is applied as one or more events under
    /// a single version bump (spec.md §4.1).
    #[instrument(skip(self, commands))]
    pub async fn respond_workflow_task_completed(
        &self,
        key: &ExecutionKey,
        commands: Vec<WorkflowCommand>,
    ) -> Result<()> {
        for command in commands {
            let attrs = match command {
                WorkflowCommand::ScheduleNode {
                    node_id,
                    node_type,
                    input,
                    options,
                } => {
                    let state = self.mutable_state.get_mutable_state(key).await?;
                    let task_queue = state
                        .info
                        .as_ref()
                        .map(|i| i.task_queue.clone())
                        .unwrap_or_else(|| "workflows-default".into());
                    EventAttributes::NodeScheduled {
                        node_id,
                        node_type,
                        input,
                        options,
                        task_queue,
                        attempt: 1,
                    }
                }
                WorkflowCommand::StartTimer { timer_id, duration_ms } => {
                    EventAttributes::TimerStarted { timer_id, duration_ms }
                }
                WorkflowCommand::CancelTimer { timer_id } => EventAttributes::TimerCanceled { timer_id },
                WorkflowCommand::CancelNode {
                    scheduled_event_id,
                    reason,
                } => EventAttributes::NodeCancelled {
                    scheduled_event_id,
                    reason,
                },
                WorkflowCommand::CompleteExecution { result } => EventAttributes::ExecutionCompleted { result },
                WorkflowCommand::FailExecution { error } => EventAttributes::ExecutionFailed { error },
                WorkflowCommand::None => continue,
            };
            self.record_event(key, attrs).await?;
        }
        Ok(())
    }

    /// `RespondActivityTaskCompleted` — appends the result, then
    /// auto-schedules a fresh `WorkflowTask` so the decider observes it
    /// (spec.md §4.1).
    #[instrument(skip(self, result))]
    pub async fn respond_activity_task_completed(
        &self,
        key: &ExecutionKey,
        scheduled_event_id: u64,
        result: serde_json::Value,
    ) -> Result<()> {
        self.record_event(
            key,
            EventAttributes::NodeCompleted {
                scheduled_event_id,
                result,
            },
        )
        .await?;
        self.schedule_workflow_task(key).await
    }

    /// `RespondActivityTaskFailed` — classifies the failure against the
    /// node's own `RetryPolicy` (spec.md §7: "retry is governed by the
    /// scheduled `RetryPolicy`") rather than trusting a caller-supplied
    /// flag, since the worker that calls this RPC has no visibility into
    /// the policy or the attempt count History is tracking. A retryable
    /// classification re-emits `NodeScheduled` with a bumped attempt
    /// after the policy's delay; otherwise the decider is woken so it can
    /// observe the terminal failure.
    #[instrument(skip(self, error))]
    pub async fn respond_activity_task_failed(
        &self,
        key: &ExecutionKey,
        scheduled_event_id: u64,
        error: NodeError,
    ) -> Result<()> {
        let state = self.mutable_state.get_mutable_state(key).await?;
        let node = state
            .pending_nodes
            .get(&scheduled_event_id)
            .cloned()
            .ok_or(EngineError::ActivityNotFound(scheduled_event_id))?;

        let policy = &node.options.retry_policy;
        let will_retry = error.retryable
            && policy.should_retry(error.code.as_deref())
            && policy.has_attempts_remaining(node.attempt);

        self.record_event(
            key,
            EventAttributes::NodeFailed {
                scheduled_event_id,
                error,
                will_retry,
            },
        )
        .await?;

        if will_retry {
            let next_attempt = node.attempt + 1;
            let delay = policy.delay_for_attempt(next_attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.record_event(
                key,
                EventAttributes::NodeScheduled {
                    node_id: node.node_id,
                    node_type: node.node_type,
                    input: node.input,
                    options: node.options,
                    task_queue: node.task_queue,
                    attempt: next_attempt,
                },
            )
            .await?;
        } else {
            self.schedule_workflow_task(key).await?;
        }
        Ok(())
    }

    async fn schedule_workflow_task(&self, key: &ExecutionKey) -> Result<()> {
        let state = self.mutable_state.get_mutable_state(key).await?;
        let task_queue = state
            .info
            .map(|i| i.task_queue)
            .unwrap_or_else(|| "workflows-default".into());
        self.record_event(key, EventAttributes::WorkflowTaskScheduled { task_queue })
            .await?;
        Ok(())
    }

    /// `ResetExecution(key, reason, resetEventID) -> newRunID` — forks a
    /// run at an earlier event. spec.md marks this a design hook whose
    /// implementation may be phased; this implementation replays the
    /// prefix up to `reset_event_id` into a fresh run under a new
    /// `run_id`, leaving the original run untouched.
    #[instrument(skip(self))]
    pub async fn reset_execution(
        &self,
        key: &ExecutionKey,
        reason: &str,
        reset_event_id: u64,
    ) -> Result<ExecutionKey> {
        let prefix = self.events.get_events(key, 1, reset_event_id).await?;
        if prefix.is_empty() {
            return Err(EngineError::EventNotFound {
                run_id: key.run_id.clone(),
                event_id: reset_event_id,
            });
        }

        let new_run_id = Uuid::now_v7().to_string();
        let new_key = ExecutionKey::new(key.namespace_id.clone(), key.workflow_id.clone(), new_run_id);
        self.shards.shard_for(&new_key)?;

        let mut state = MutableState::new();
        let mut rewritten = Vec::with_capacity(prefix.len());
        for event in &prefix {
            let mut event = event.clone();
            event.timestamp = Utc::now();
            state.apply(&event);
            rewritten.push(event);
        }
        state.db_version = 0;

        self.events.append_events(&new_key, &rewritten, 0).await?;
        self.mutable_state.create_mutable_state(&new_key, &state).await?;

        if let Some(first) = rewritten.first() {
            if let EventAttributes::ExecutionStarted { workflow_type, .. } = &first.attributes {
                self.visibility
                    .record_started(VisibilityRecord {
                        key: new_key.clone(),
                        workflow_type: workflow_type.clone(),
                        status: "running".into(),
                        start_time: first.timestamp,
                        close_time: None,
                    })
                    .await?;
            }
        }

        info!(%key, %new_key, reason, reset_event_id, "execution reset");
        Ok(new_key)
    }

    /// `ListWorkflowExecutions(namespaceID, query, pageSize, token)` —
    /// delegated to the visibility collaborator (spec.md §4.1). `query`
    /// selects open vs. closed executions; richer filtering is out of
    /// scope (spec.md Non-goals).
    #[instrument(skip(self))]
    pub async fn list_workflow_executions(
        &self,
        namespace_id: &str,
        open_only: bool,
        page_size: usize,
    ) -> Result<Vec<VisibilityRecord>> {
        if open_only {
            self.visibility.list_open(namespace_id, page_size).await
        } else {
            self.visibility.list_closed(namespace_id, page_size).await
        }
    }
}

/// Logged instead of propagated per spec.md §4.1 "Failure semantics":
/// a crash between `AppendEvents` and `UpdateMutableState` is not a
/// caller-visible error, it's a recoverable staleness the next read
/// resolves by rebuilding from events.
pub fn warn_stale_projection(key: &ExecutionKey) {
    warn!(%key, "mutable state projection may be stale; next read will rebuild from events");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{InMemoryEventStore, InMemoryMutableStateStore, InMemoryVisibilityStore};
    use crate::task_dispatch::RecordingDispatcher;
    use linkflow_types::TimeoutConfig;
    use serde_json::json;

    fn engine() -> (HistoryEngine, Arc<RecordingDispatcher>) {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let engine = HistoryEngine::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryMutableStateStore::new()),
            Arc::new(InMemoryVisibilityStore::new()),
            dispatcher.clone(),
            ShardController::default(),
        );
        (engine, dispatcher)
    }

    fn key() -> ExecutionKey {
        ExecutionKey::new("ns", "wf", "run1")
    }

    #[tokio::test]
    async fn execution_started_emits_workflow_task_and_visibility_record() {
        let (engine, dispatcher) = engine();
        let key = key();
        let event_id = engine
            .record_event(
                &key,
                EventAttributes::ExecutionStarted {
                    workflow_type: "order_flow".into(),
                    task_queue: "workflows-default".into(),
                    input: json!({}),
                    timeout_config: TimeoutConfig::default(),
                },
            )
            .await
            .unwrap();
        assert_eq!(event_id, 1);
        assert_eq!(dispatcher.tasks().len(), 1);
        assert_eq!(dispatcher.tasks()[0].0, "workflows-default");

        let state = engine.get_mutable_state(&key).await.unwrap();
        assert_eq!(state.next_event_id, 2);
    }

    #[tokio::test]
    async fn respond_workflow_task_completed_schedules_node() {
        let (engine, dispatcher) = engine();
        let key = key();
        engine
            .record_event(
                &key,
                EventAttributes::ExecutionStarted {
                    workflow_type: "order_flow".into(),
                    task_queue: "workflows-default".into(),
                    input: json!({}),
                    timeout_config: TimeoutConfig::default(),
                },
            )
            .await
            .unwrap();

        engine
            .respond_workflow_task_completed(
                &key,
                vec![WorkflowCommand::schedule_node("n1", "http_call", json!({}))],
            )
            .await
            .unwrap();

        assert_eq!(dispatcher.tasks().len(), 2);
        let state = engine.get_mutable_state(&key).await.unwrap();
        assert_eq!(state.pending_nodes.len(), 1);
    }

    #[tokio::test]
    async fn activity_completion_reschedules_workflow_task() {
        let (engine, dispatcher) = engine();
        let key = key();
        engine
            .record_event(
                &key,
                EventAttributes::ExecutionStarted {
                    workflow_type: "order_flow".into(),
                    task_queue: "workflows-default".into(),
                    input: json!({}),
                    timeout_config: TimeoutConfig::default(),
                },
            )
            .await
            .unwrap();
        engine
            .respond_workflow_task_completed(
                &key,
                vec![WorkflowCommand::schedule_node("n1", "http_call", json!({}))],
            )
            .await
            .unwrap();

        engine
            .respond_activity_task_completed(&key, 2, json!({"ok": true}))
            .await
            .unwrap();

        let state = engine.get_mutable_state(&key).await.unwrap();
        assert!(state.pending_nodes.is_empty());
        assert!(state.completed_nodes.contains_key("n1"));
        // start task, node task, reschedule workflow task
        assert_eq!(dispatcher.tasks().len(), 3);
    }

    #[tokio::test]
    async fn record_event_on_unstarted_execution_fails() {
        let (engine, _dispatcher) = engine();
        let key = key();
        let err = engine
            .record_event(&key, EventAttributes::ExecutionCompleted { result: json!({}) })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ExecutionNotFound(_)));
    }

    #[tokio::test]
    async fn retryable_failure_reschedules_node_with_bumped_attempt() {
        use linkflow_types::{NodeError, NodeOptions, RetryPolicy};
        use std::time::Duration;

        let (engine, dispatcher) = engine();
        let key = key();
        engine
            .record_event(
                &key,
                EventAttributes::ExecutionStarted {
                    workflow_type: "order_flow".into(),
                    task_queue: "workflows-default".into(),
                    input: json!({}),
                    timeout_config: TimeoutConfig::default(),
                },
            )
            .await
            .unwrap();

        let retry_policy = RetryPolicy::fixed(Duration::ZERO, 2);
        engine
            .record_event(
                &key,
                EventAttributes::NodeScheduled {
                    node_id: "n1".into(),
                    node_type: "http_call".into(),
                    input: json!({}),
                    options: NodeOptions::new().with_retry_policy(retry_policy),
                    task_queue: "workflows-default".into(),
                    attempt: 1,
                },
            )
            .await
            .unwrap();

        // First failure: attempt 1 < max_attempts 2, retryable error -> a
        // fresh NodeScheduled at attempt 2, no workflow task yet.
        engine
            .respond_activity_task_failed(&key, 2, NodeError::retryable("timeout"))
            .await
            .unwrap();

        let state = engine.get_mutable_state(&key).await.unwrap();
        assert_eq!(state.pending_nodes.len(), 1);
        let retried = state.pending_nodes.values().next().unwrap();
        assert_eq!(retried.attempt, 2);
        assert!(!state.pending_nodes.contains_key(&2));

        // Second failure: attempt 2 >= max_attempts 2 -> exhausted, wakes
        // the decider instead of scheduling another attempt.
        let new_scheduled_event_id = *state.pending_nodes.keys().next().unwrap();
        let tasks_before = dispatcher.tasks().len();
        engine
            .respond_activity_task_failed(&key, new_scheduled_event_id, NodeError::retryable("timeout"))
            .await
            .unwrap();

        let state = engine.get_mutable_state(&key).await.unwrap();
        assert!(state.pending_nodes.is_empty());
        assert_eq!(dispatcher.tasks().len(), tasks_before + 1);
    }

    #[tokio::test]
    async fn non_retryable_failure_never_reschedules() {
        use linkflow_types::NodeError;

        let (engine, _dispatcher) = engine();
        let key = key();
        engine
            .record_event(
                &key,
                EventAttributes::ExecutionStarted {
                    workflow_type: "order_flow".into(),
                    task_queue: "workflows-default".into(),
                    input: json!({}),
                    timeout_config: TimeoutConfig::default(),
                },
            )
            .await
            .unwrap();
        engine
            .respond_workflow_task_completed(
                &key,
                vec![WorkflowCommand::schedule_node("n1", "http_call", json!({}))],
            )
            .await
            .unwrap();

        engine
            .respond_activity_task_failed(&key, 2, NodeError::non_retryable("bad input"))
            .await
            .unwrap();

        let state = engine.get_mutable_state(&key).await.unwrap();
        assert!(state.pending_nodes.is_empty());
    }
}
