//! Matching's dispatchable unit of work and its token protocol.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::key::ExecutionKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum TaskType {
    WorkflowTask,
    ActivityTask,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Task {
    /// Deterministic: `namespace:workflowID:runID:taskType:scheduledEventID`
    /// — re-adding an equal ID is a no-op, which is what makes dispatch
    /// idempotent.
    pub id: String,
    pub key: ExecutionKey,
    pub task_type: TaskType,
    pub scheduled_event_id: u64,
    pub attempt: u32,
    pub scheduled_at: DateTime<Utc>,
    pub input: serde_json::Value,
}

impl Task {
    pub fn new(key: ExecutionKey, task_type: TaskType, scheduled_event_id: u64, input: serde_json::Value) -> Self {
        let id = deterministic_task_id(&key, task_type, scheduled_event_id);
        Self {
            id,
            key,
            task_type,
            scheduled_event_id,
            attempt: 0,
            scheduled_at: Utc::now(),
            input,
        }
    }
}

pub fn deterministic_task_id(key: &ExecutionKey, task_type: TaskType, scheduled_event_id: u64) -> String {
    let type_tag = match task_type {
        TaskType::WorkflowTask => "workflow_task",
        TaskType::ActivityTask => "activity_task",
    };
    format!(
        "{}:{}:{}:{}:{}",
        key.namespace_id, key.workflow_id, key.run_id, type_tag, scheduled_event_id
    )
}

/// `"<namespace>|<queue>|<taskID>|<random32hex>"` — the bit-exact task
/// token format (spec.md §6). Retained as a delimited string
/// deliberately for cross-language transparency (§9 design notes); the
/// random suffix prevents forged completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskToken {
    pub namespace: String,
    pub queue: String,
    pub task_id: String,
    pub nonce: String,
}

impl TaskToken {
    pub fn generate(namespace: impl Into<String>, queue: impl Into<String>, task_id: impl Into<String>) -> Self {
        let mut rng = rand::thread_rng();
        let nonce: String = (0..32)
            .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap())
            .collect();
        Self {
            namespace: namespace.into(),
            queue: queue.into(),
            task_id: task_id.into(),
            nonce,
        }
    }

    pub fn encode(&self) -> String {
        format!("{}|{}|{}|{}", self.namespace, self.queue, self.task_id, self.nonce)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split('|').collect();
        if parts.len() != 4 {
            return Err(EngineError::InvalidEvent(format!(
                "task token must have exactly 4 fields, got {}",
                parts.len()
            )));
        }
        if parts[3].len() != 32 || !parts[3].chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EngineError::InvalidEvent(
                "task token nonce must be 32 hex characters".into(),
            ));
        }
        Ok(Self {
            namespace: parts[0].to_string(),
            queue: parts[1].to_string(),
            task_id: parts[2].to_string(),
            nonce: parts[3].to_string(),
        })
    }
}

impl std::fmt::Display for TaskToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_is_deterministic() {
        let key = ExecutionKey::new("ns", "wf", "run1");
        let a = deterministic_task_id(&key, TaskType::ActivityTask, 4);
        let b = deterministic_task_id(&key, TaskType::ActivityTask, 4);
        assert_eq!(a, b);
        assert_eq!(a, "ns:wf:run1:activity_task:4");
    }

    #[test]
    fn token_round_trips() {
        let token = TaskToken::generate("ns", "workflows-default", "task-1");
        let encoded = token.encode();
        let parsed = TaskToken::parse(&encoded).unwrap();
        assert_eq!(token, parsed);
        assert_eq!(encoded.matches('|').count(), 3);
    }

    #[test]
    fn parse_rejects_wrong_field_count() {
        assert!(TaskToken::parse("a|b|c").is_err());
    }

    #[test]
    fn parse_rejects_short_nonce() {
        assert!(TaskToken::parse("ns|q|id|deadbeef").is_err());
    }
}
