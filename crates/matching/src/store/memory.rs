//! In-memory task store: a FIFO queue plus a dedupe set, guarded by a
//! single lock. Used for development and for queues that rely on the
//! WAL (`crate::wal`) for their durability floor rather than Redis.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linkflow_types::{Result, Task};
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::TaskStore;

#[derive(Default)]
struct Inner {
    queue: VecDeque<Task>,
    ids: HashSet<String>,
}

pub struct InMemoryTaskStore {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl InMemoryTaskStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
        })
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
        }
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn add_task(&self, task: Task) -> Result<bool> {
        let added = {
            let mut inner = self.inner.lock();
            if !inner.ids.insert(task.id.clone()) {
                false
            } else {
                inner.queue.push_back(task);
                true
            }
        };
        if added {
            self.notify.notify_one();
        }
        Ok(added)
    }

    async fn poll_task(&self, timeout: Duration) -> Result<Option<Task>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(task) = {
                let mut inner = self.inner.lock();
                let task = inner.queue.pop_front();
                if let Some(task) = &task {
                    inner.ids.remove(&task.id);
                }
                task
            } {
                return Ok(Some(task));
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(deadline - now) => return Ok(None),
            }
        }
    }

    async fn ack_task(&self, task_id: &str) -> Result<bool> {
        // The in-memory store already removed the task from `queue` at
        // poll time; completion only needs to drop it from the dedupe
        // set so a re-add with the same deterministic ID is accepted.
        let mut inner = self.inner.lock();
        Ok(inner.ids.remove(task_id))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.lock().queue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkflow_types::{ExecutionKey, TaskType};

    fn task(id_suffix: &str) -> Task {
        let key = ExecutionKey::new("ns", format!("wf-{id_suffix}"), "run1");
        Task::new(key, TaskType::ActivityTask, 1, serde_json::json!({}))
    }

    #[tokio::test]
    async fn add_then_poll_is_fifo() {
        let store = InMemoryTaskStore::new();
        store.add_task(task("a")).await.unwrap();
        store.add_task(task("b")).await.unwrap();

        let first = store.poll_task(Duration::from_millis(10)).await.unwrap().unwrap();
        assert!(first.id.contains("wf-a"));
    }

    #[tokio::test]
    async fn duplicate_add_is_rejected() {
        let store = InMemoryTaskStore::new();
        let t = task("dup");
        assert!(store.add_task(t.clone()).await.unwrap());
        assert!(!store.add_task(t).await.unwrap());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn poll_times_out_when_empty() {
        let store = InMemoryTaskStore::new();
        let result = store.poll_task(Duration::from_millis(20)).await.unwrap();
        assert!(result.is_none());
    }
}
