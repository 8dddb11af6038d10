//! A single task queue: the `AddTask`/`Poll`/`CompleteTask`/
//! `RequeueExpiredTasks` operations named in spec.md §4.2, composed
//! from the collaborators in this crate (`TaskStore`, backpressure,
//! rate limiting, sticky affinity, WAL, metrics, DLQ).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use linkflow_types::{EngineError, Result, Task, TaskToken};
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::backpressure::{BackpressureConfig, BackpressureTracker};
use crate::dlq::DeadLetterQueue;
use crate::metrics::QueueMetrics;
use crate::rate_limiter::TokenBucket;
use crate::sticky::StickyAffinity;
use crate::store::TaskStore;
use crate::wal::Wal;

pub const DEFAULT_LEASE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct TaskQueueConfig {
    pub namespace: String,
    pub lease_timeout: Duration,
    pub sticky: bool,
    pub backpressure: BackpressureConfig,
    pub rate_per_sec: f64,
    pub burst: u32,
    pub max_retries: u32,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            namespace: "default".into(),
            lease_timeout: DEFAULT_LEASE_TIMEOUT,
            sticky: false,
            backpressure: BackpressureConfig::default(),
            rate_per_sec: crate::rate_limiter::DEFAULT_RATE_PER_SEC,
            burst: crate::rate_limiter::DEFAULT_BURST,
            max_retries: crate::dlq::DEFAULT_MAX_RETRIES,
        }
    }
}

struct Lease {
    task: Task,
    token: TaskToken,
    leased_at: Instant,
}

pub struct TaskQueue {
    name: String,
    config: TaskQueueConfig,
    store: Arc<dyn TaskStore>,
    wal: Option<Arc<Wal>>,
    backpressure: BackpressureTracker,
    rate_limiter: TokenBucket,
    sticky: Option<StickyAffinity>,
    in_flight: Mutex<HashMap<String, Lease>>,
    pub metrics: QueueMetrics,
    dlq: Arc<DeadLetterQueue>,
}

impl TaskQueue {
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn TaskStore>,
        dlq: Arc<DeadLetterQueue>,
        config: TaskQueueConfig,
    ) -> Self {
        let sticky = config.sticky.then(|| StickyAffinity::new(config.lease_timeout));
        Self {
            name: name.into(),
            backpressure: BackpressureTracker::new(config.backpressure),
            rate_limiter: TokenBucket::new(config.rate_per_sec, config.burst),
            sticky,
            store,
            wal: None,
            in_flight: Mutex::new(HashMap::new()),
            metrics: QueueMetrics::new(),
            dlq,
            config,
        }
    }

    pub fn with_wal(mut self, wal: Arc<Wal>) -> Self {
        self.wal = Some(wal);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `AddTask(task)`. `EngineError::TaskExists` is the idempotent-noop
    /// convention (spec.md §4.2) — callers treat it as success.
    #[instrument(skip(self, task), fields(queue = %self.name, task_id = %task.id))]
    pub async fn add_task(&self, task: Task) -> Result<()> {
        let depth = self.store.len().await? as u64;
        self.backpressure.check(depth, &self.name);
        if self.backpressure.should_reject() {
            return Err(EngineError::Backpressure { queue: self.name.clone(), depth });
        }

        let task_id = task.id.clone();
        let added = self.store.add_task(task.clone()).await?;
        if !added {
            return Err(EngineError::TaskExists(task_id));
        }

        if let Some(wal) = &self.wal {
            wal.record_add(&task).await?;
        }
        self.metrics.tasks_added.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.metrics.depth.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }

    /// `Poll(ctx, identity) -> Task | nil`.
    #[instrument(skip(self), fields(queue = %self.name, identity = %identity))]
    pub async fn poll(&self, identity: &str, timeout: Duration) -> Result<Option<(Task, TaskToken)>> {
        if !self.rate_limiter.try_acquire() {
            return Err(EngineError::RateLimited(self.name.clone()));
        }

        let poll_started = Instant::now();
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let Some(task) = self.store.poll_task(remaining).await? else {
                return Ok(None);
            };

            if let Some(sticky) = &self.sticky {
                if !sticky.allow(&task.key.workflow_id, identity) {
                    // Bound to a different, still-live identity: put it
                    // back and keep polling until our deadline.
                    self.store.add_task(task).await.ok();
                    continue;
                }
            }

            let token = TaskToken::generate(&self.config.namespace, &self.name, &task.id);
            self.in_flight.lock().insert(
                task.id.clone(),
                Lease { task: task.clone(), token: token.clone(), leased_at: Instant::now() },
            );

            self.metrics.tasks_dispatched.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.metrics.depth.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
            self.metrics.in_flight.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.metrics.record_dispatch_latency(poll_started.elapsed());

            return Ok(Some((task, token)));
        }
    }

    /// `CompleteTask(taskID)`.
    #[instrument(skip(self, token), fields(queue = %self.name))]
    pub async fn complete_task(&self, token: &TaskToken) -> Result<()> {
        let lease = self
            .in_flight
            .lock()
            .remove(&token.task_id)
            .ok_or_else(|| EngineError::TaskNotFound(token.task_id.clone()))?;

        if lease.token != *token {
            // A stale or forged token: put the lease back, refuse.
            self.in_flight.lock().insert(token.task_id.clone(), lease);
            return Err(EngineError::TaskNotFound(token.task_id.clone()));
        }

        self.store.ack_task(&token.task_id).await?;
        if let Some(wal) = &self.wal {
            wal.record_complete(&token.task_id).await?;
        }
        self.metrics.in_flight.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }

    /// Whether `token` still owns its task's lease — used by
    /// `HeartbeatTask` to extend a long-running activity's lease.
    pub fn heartbeat(&self, token: &TaskToken) -> bool {
        let mut in_flight = self.in_flight.lock();
        match in_flight.get_mut(&token.task_id) {
            Some(lease) if lease.token == *token => {
                lease.leased_at = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// `RequeueExpiredTasks()`. Sweeps the in-flight map for leases
    /// past their expiry; re-enqueues under an incremented attempt, or
    /// moves to the DLQ at `max_retries`.
    #[instrument(skip(self), fields(queue = %self.name))]
    pub async fn requeue_expired_tasks(&self) -> Result<usize> {
        let expired: Vec<Lease> = {
            let mut in_flight = self.in_flight.lock();
            let expired_ids: Vec<String> = in_flight
                .iter()
                .filter(|(_, lease)| lease.leased_at.elapsed() >= self.config.lease_timeout)
                .map(|(id, _)| id.clone())
                .collect();
            expired_ids.into_iter().filter_map(|id| in_flight.remove(&id)).collect()
        };

        let count = expired.len();
        for lease in expired {
            self.metrics.in_flight.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
            let mut task = lease.task;
            task.attempt += 1;

            if task.attempt >= self.config.max_retries {
                warn!(queue = %self.name, task_id = %task.id, attempts = task.attempt, "lease expired past max_retries, moving to DLQ");
                self.metrics.tasks_dlq.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.dlq.push(task, "lease expired".into(), self.config.max_retries, None);
            } else {
                info!(queue = %self.name, task_id = %task.id, attempt = task.attempt, "requeuing task after lease expiry");
                self.metrics.tasks_timed_out.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                if let Some(wal) = &self.wal {
                    wal.record_add(&task).await?;
                }
                self.store.add_task(task).await?;
                self.metrics.depth.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }
        Ok(count)
    }

    pub async fn depth(&self) -> Result<usize> {
        self.store.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTaskStore;
    use linkflow_types::{ExecutionKey, TaskType};

    fn task(id: &str) -> Task {
        let key = ExecutionKey::new("ns", id, "run1");
        Task::new(key, TaskType::ActivityTask, 1, serde_json::json!({}))
    }

    fn build_queue(config: TaskQueueConfig) -> TaskQueue {
        TaskQueue::new("q", InMemoryTaskStore::new(), Arc::new(DeadLetterQueue::default()), config)
    }

    #[tokio::test]
    async fn add_then_poll_then_complete_round_trips() {
        let queue = build_queue(TaskQueueConfig::default());
        queue.add_task(task("a")).await.unwrap();

        let (polled, token) = queue.poll("worker-1", Duration::from_millis(50)).await.unwrap().unwrap();
        assert_eq!(polled.id, task("a").id);

        queue.complete_task(&token).await.unwrap();
        assert_eq!(queue.depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_add_surfaces_task_exists() {
        let queue = build_queue(TaskQueueConfig::default());
        queue.add_task(task("a")).await.unwrap();
        let err = queue.add_task(task("a")).await.unwrap_err();
        assert!(err.is_idempotent_noop());
    }

    #[tokio::test]
    async fn complete_with_wrong_token_is_rejected() {
        let queue = build_queue(TaskQueueConfig::default());
        queue.add_task(task("a")).await.unwrap();
        let (polled, _token) = queue.poll("worker-1", Duration::from_millis(50)).await.unwrap().unwrap();

        let forged = TaskToken::generate("ns", "q", &polled.id);
        assert!(queue.complete_task(&forged).await.is_err());
    }

    #[tokio::test]
    async fn requeue_expired_moves_to_dlq_after_max_retries() {
        let mut config = TaskQueueConfig::default();
        config.lease_timeout = Duration::from_millis(1);
        config.max_retries = 1;
        let queue = build_queue(config);

        queue.add_task(task("a")).await.unwrap();
        queue.poll("worker-1", Duration::from_millis(50)).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let reclaimed = queue.requeue_expired_tasks().await.unwrap();
        assert_eq!(reclaimed, 1);
        assert_eq!(queue.dlq.len(), 1);
        assert_eq!(queue.depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sticky_poll_binds_the_first_identity_for_a_workflow() {
        let mut config = TaskQueueConfig::default();
        config.sticky = true;
        config.lease_timeout = Duration::from_secs(60);
        let queue = build_queue(config);

        queue.add_task(task("a")).await.unwrap();
        let (polled, _token) = queue.poll("worker-1", Duration::from_millis(50)).await.unwrap().unwrap();
        assert!(queue.sticky.as_ref().unwrap().allow(&polled.key.workflow_id, "worker-1"));
        assert!(!queue.sticky.as_ref().unwrap().allow(&polled.key.workflow_id, "worker-2"));
    }
}
