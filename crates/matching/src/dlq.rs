//! Dead-letter queue: shared across task queues, bounded (spec.md
//! §4.2 "Dead-letter queue (DLQ)"). A task whose attempt count reaches
//! `max_retries` on lease expiry lands here instead of being
//! re-enqueued.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use linkflow_types::{EngineError, Result, Task};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_DLQ_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeadLetter {
    pub task: Task,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

pub struct DeadLetterQueue {
    capacity: usize,
    entries: Mutex<VecDeque<DeadLetter>>,
}

impl DeadLetterQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Moves a task in, evicting the oldest entry if at capacity —
    /// the DLQ is an operator inspection aid, not a durability
    /// guarantee, so bounded eviction is acceptable.
    pub fn push(&self, task: Task, reason: String, attempts: u32, last_error: Option<String>) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(DeadLetter {
            task,
            reason,
            failed_at: Utc::now(),
            attempts,
            last_error,
        });
    }

    pub fn list(&self) -> Vec<DeadLetter> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Resets attempt count to 0 and removes the entry; the caller
    /// re-adds the returned task to its original queue.
    pub fn retry(&self, task_id: &str) -> Result<Task> {
        let mut entries = self.entries.lock();
        let index = entries
            .iter()
            .position(|entry| entry.task.id == task_id)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;
        let mut entry = entries.remove(index).expect("index just found");
        entry.task.attempt = 0;
        Ok(entry.task)
    }

    pub fn remove(&self, task_id: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        let index = entries
            .iter()
            .position(|entry| entry.task.id == task_id)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;
        entries.remove(index);
        Ok(())
    }

    pub fn purge(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DeadLetterQueue {
    fn default() -> Self {
        Self::new(DEFAULT_DLQ_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkflow_types::{ExecutionKey, TaskType};

    fn task(id: &str) -> Task {
        let key = ExecutionKey::new("ns", id, "run1");
        Task::new(key, TaskType::ActivityTask, 1, serde_json::json!({}))
    }

    #[test]
    fn retry_resets_attempt_and_removes_entry() {
        let dlq = DeadLetterQueue::default();
        let mut t = task("a");
        t.attempt = 3;
        dlq.push(t.clone(), "lease expired".into(), 3, Some("timeout".into()));

        let retried = dlq.retry(&t.id).unwrap();
        assert_eq!(retried.attempt, 0);
        assert!(dlq.is_empty());
    }

    #[test]
    fn bounded_capacity_evicts_oldest() {
        let dlq = DeadLetterQueue::new(2);
        dlq.push(task("a"), "r".into(), 3, None);
        dlq.push(task("b"), "r".into(), 3, None);
        dlq.push(task("c"), "r".into(), 3, None);

        let remaining: Vec<_> = dlq.list().into_iter().map(|e| e.task.id).collect();
        assert_eq!(remaining.len(), 2);
        assert!(!remaining.iter().any(|id| id.contains(":a:")));
    }

    #[test]
    fn remove_missing_task_errors() {
        let dlq = DeadLetterQueue::default();
        assert!(dlq.remove("nonexistent").is_err());
    }
}
