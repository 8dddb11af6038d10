//! Owns every task queue this process serves: queues are created
//! lazily on first `AddTask`/`Poll` (spec.md §4.2 "Partitioning"), all
//! sharing one DLQ and one partition ring.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use linkflow_types::{EngineError, Result, Task, TaskToken};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::dlq::DeadLetterQueue;
use crate::partition::PartitionRing;
use crate::queue::{TaskQueue, TaskQueueConfig};
use crate::store::InMemoryTaskStore;
use crate::wal::Wal;

pub struct MatchingManager {
    namespace: String,
    ring: PartitionRing,
    owned_partitions: Vec<u32>,
    wal_dir: Option<PathBuf>,
    sticky_queue_suffix: &'static str,
    queues: RwLock<HashMap<String, Arc<TaskQueue>>>,
    pub dlq: Arc<DeadLetterQueue>,
}

impl MatchingManager {
    pub fn new(namespace: impl Into<String>, ring: PartitionRing, owned_partitions: Vec<u32>, wal_dir: Option<PathBuf>) -> Self {
        Self {
            namespace: namespace.into(),
            ring,
            owned_partitions,
            wal_dir,
            sticky_queue_suffix: "-sticky",
            queues: RwLock::new(HashMap::new()),
            dlq: Arc::new(DeadLetterQueue::default()),
        }
    }

    fn owns(&self, queue: &str) -> bool {
        self.owned_partitions.contains(&self.ring.partition_for_task_queue(queue))
    }

    fn queue_config(&self, name: &str) -> TaskQueueConfig {
        TaskQueueConfig {
            namespace: self.namespace.clone(),
            sticky: name.ends_with(self.sticky_queue_suffix),
            ..TaskQueueConfig::default()
        }
    }

    /// Returns the existing queue or lazily creates it, replaying its
    /// WAL if one is configured.
    pub async fn queue_for(&self, name: &str) -> Result<Arc<TaskQueue>> {
        if !self.owns(name) {
            return Err(EngineError::ShardNotOwned(self.ring.partition_for_task_queue(name)));
        }

        if let Some(queue) = self.queues.read().get(name) {
            return Ok(queue.clone());
        }

        let store = InMemoryTaskStore::new();
        let mut queue = TaskQueue::new(name, store.clone(), self.dlq.clone(), self.queue_config(name));

        if let Some(dir) = &self.wal_dir {
            std::fs::create_dir_all(dir).map_err(|e| EngineError::Store(e.to_string()))?;
            let wal_path = dir.join(format!("{name}.wal"));
            for task in Wal::replay(&wal_path)? {
                // A restart replays surviving adds before this queue
                // accepts new traffic.
                store.add_task(task).await?;
            }
            queue = queue.with_wal(Arc::new(Wal::open(wal_path)?));
        }

        let queue = Arc::new(queue);
        // Another caller may have raced us to create the same queue;
        // the loser's freshly built queue (and replayed WAL reader) is
        // simply dropped in favor of the winner already in the map.
        let mut queues = self.queues.write();
        Ok(queues.entry(name.to_string()).or_insert(queue).clone())
    }

    pub async fn add_task(&self, queue: &str, task: Task) -> Result<bool> {
        let q = self.queue_for(queue).await?;
        match q.add_task(task).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_idempotent_noop() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn poll_task(&self, queue: &str, identity: &str, timeout: Duration) -> Result<Option<(Task, TaskToken)>> {
        let q = self.queue_for(queue).await?;
        q.poll(identity, timeout).await
    }

    pub async fn complete_task(&self, queue: &str, token: &TaskToken) -> Result<()> {
        let q = self.queue_for(queue).await?;
        q.complete_task(token).await
    }

    pub async fn heartbeat_task(&self, queue: &str, token: &TaskToken) -> Result<bool> {
        let q = self.queue_for(queue).await?;
        Ok(q.heartbeat(token))
    }

    /// Sweeps every known queue for expired leases. Driven by a
    /// periodic ticker in `main.rs`.
    pub async fn requeue_expired_tasks(&self) -> Result<usize> {
        let queues: Vec<Arc<TaskQueue>> = self.queues.read().values().cloned().collect();
        let mut total = 0;
        for queue in queues {
            total += queue.requeue_expired_tasks().await?;
        }
        Ok(total)
    }

    /// Operator surface for the shared DLQ (spec.md §4.2 "operators can
    /// List, Retry, Remove, Purge"), exposed over gRPC and `linkflow-cli`.
    pub fn dlq_list(&self) -> Vec<crate::dlq::DeadLetter> {
        self.dlq.list()
    }

    /// Resets the entry's attempt count and re-adds it to `queue`.
    pub async fn dlq_retry(&self, queue: &str, task_id: &str) -> Result<()> {
        let task = self.dlq.retry(task_id)?;
        self.add_task(queue, task).await?;
        Ok(())
    }

    pub fn dlq_remove(&self, task_id: &str) -> Result<()> {
        self.dlq.remove(task_id)
    }

    pub fn dlq_purge(&self) -> usize {
        let purged = self.dlq.len();
        self.dlq.purge();
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkflow_types::{ExecutionKey, TaskType};

    fn task(workflow_id: &str) -> Task {
        let key = ExecutionKey::new("ns", workflow_id, "run1");
        Task::new(key, TaskType::ActivityTask, 1, serde_json::json!({}))
    }

    #[tokio::test]
    async fn unowned_queue_is_rejected() {
        let manager = MatchingManager::new("ns", PartitionRing::new(4, 100), vec![], None);
        let err = manager.add_task("orders-default", task("wf1")).await.unwrap_err();
        assert!(matches!(err, EngineError::ShardNotOwned(_)));
    }

    #[tokio::test]
    async fn owning_every_partition_creates_queues_lazily() {
        let manager = MatchingManager::new("ns", PartitionRing::new(4, 100), vec![0, 1, 2, 3], None);
        assert!(manager.add_task("orders-default", task("wf1")).await.unwrap());

        let (polled, token) = manager
            .poll_task("orders-default", "worker-1", Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(polled.key.workflow_id, "wf1");
        manager.complete_task("orders-default", &token).await.unwrap();
    }
}
