//! The worker control loop itself (spec.md §4.4): one polling task per
//! configured queue, task execution bounded by a semaphore, graceful
//! shutdown via a broadcast `watch` — the same shape as the teacher's
//! `WorkerPool` generalized from a single activity-task model to this
//! engine's workflow-task/activity-task split.

use std::sync::Arc;

use linkflow_types::{EngineError, ExecutionKey, NodeError, Task, TaskToken, TaskType};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::clients::EngineClients;
use crate::config::Config;
use crate::decider::DeciderRegistry;
use crate::handler::{HandlerRegistry, NodeTask};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Owns the decider/handler registries and drives one poll loop per
/// task queue. Construct, register deciders/handlers, then [`Worker::run`].
pub struct Worker {
    clients: EngineClients,
    config: Config,
    deciders: Arc<DeciderRegistry>,
    handlers: Arc<HandlerRegistry>,
    concurrency: Arc<Semaphore>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Worker {
    pub fn new(clients: EngineClients, config: Config) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let concurrency = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            clients,
            concurrency,
            deciders: Arc::new(DeciderRegistry::new()),
            handlers: Arc::new(HandlerRegistry::new()),
            shutdown_tx,
            shutdown_rx,
            config,
        }
    }

    pub fn deciders(&self) -> &Arc<DeciderRegistry> {
        &self.deciders
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    /// Signals every poll loop to stop accepting new tasks; in-flight
    /// tasks still complete (SPEC_FULL.md §2 "Graceful shutdown").
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Spawns one poll loop per configured task queue and waits for all
    /// of them to drain after a shutdown signal.
    pub async fn run(&self) {
        let mut handles: Vec<JoinHandle<()>> = Vec::new();
        for queue in &self.config.task_queues {
            handles.push(self.spawn_queue_loop(queue.clone()));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    fn spawn_queue_loop(&self, queue: String) -> JoinHandle<()> {
        let clients = self.clients.clone();
        let identity = self.config.identity.clone();
        let poll_timeout = self.config.poll_timeout;
        let deciders = self.deciders.clone();
        let handlers = self.handlers.clone();
        let concurrency = self.concurrency.clone();
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::spawn(async move {
            info!(queue, identity, "worker poll loop starting");
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                let polled = tokio::select! {
                    result = clients.poll_task(&queue, &identity, poll_timeout) => result,
                    _ = shutdown_rx.changed() => break,
                };

                let (task, token) = match polled {
                    Ok(Some(pair)) => pair,
                    Ok(None) => continue,
                    Err(e) => {
                        error!(queue, error = %e, "poll_task failed");
                        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                        continue;
                    }
                };

                let permit = concurrency.clone().acquire_owned().await.expect("semaphore not closed");
                let clients = clients.clone();
                let deciders = deciders.clone();
                let handlers = handlers.clone();
                let queue = queue.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = execute_task(&clients, &deciders, &handlers, task, &token).await {
                        warn!(queue, error = %e, "task execution failed");
                    }
                    if let Err(e) = clients.complete_task(&queue, &token).await {
                        error!(queue, error = %e, "complete_task failed");
                    }
                });
            }
            info!(queue, "worker poll loop stopped");
        })
    }
}

async fn execute_task(
    clients: &EngineClients,
    deciders: &DeciderRegistry,
    handlers: &HandlerRegistry,
    task: Task,
    token: &TaskToken,
) -> Result<(), WorkerError> {
    match task.task_type {
        TaskType::WorkflowTask => execute_workflow_task(clients, deciders, &task.key, token).await,
        TaskType::ActivityTask => {
            execute_activity_task(clients, handlers, &task.key, task.scheduled_event_id, task.input).await
        }
    }
}

/// spec.md §4.4 step 3: fetch state, run the decider, report commands.
async fn execute_workflow_task(
    clients: &EngineClients,
    deciders: &DeciderRegistry,
    key: &ExecutionKey,
    token: &TaskToken,
) -> Result<(), WorkerError> {
    let state = clients.get_mutable_state(key).await?;
    let workflow_type = state.info.as_ref().map(|i| i.workflow_type.clone());

    let commands = match workflow_type.as_deref().and_then(|t| deciders.get(t)) {
        Some(decider) => decider.decide(&state),
        None => {
            debug!(?workflow_type, %key, "no decider registered; workflow task reported with no commands");
            Vec::new()
        }
    };

    clients.respond_workflow_task_completed(key, token, commands).await?;
    Ok(())
}

/// spec.md §4.4 step 4: look up the node-type handler via the pending
/// node's recorded type, execute it, and report the outcome.
async fn execute_activity_task(
    clients: &EngineClients,
    handlers: &HandlerRegistry,
    key: &ExecutionKey,
    scheduled_event_id: u64,
    input: serde_json::Value,
) -> Result<(), WorkerError> {
    let state = clients.get_mutable_state(key).await?;
    let Some(node_info) = state.pending_nodes.get(&scheduled_event_id).cloned() else {
        warn!(%key, scheduled_event_id, "activity task has no matching pending node; skipping");
        return Ok(());
    };

    let Some(handler) = handlers.get(&node_info.node_type) else {
        let error = NodeError::non_retryable(format!("no handler registered for node type {}", node_info.node_type));
        clients.respond_activity_task_failed(key, scheduled_event_id, error).await?;
        return Ok(());
    };

    let outcome = handler(NodeTask {
        node_id: node_info.node_id,
        node_type: node_info.node_type,
        attempt: node_info.attempt,
        input,
    })
    .await;

    match outcome {
        Ok(result) => clients.respond_activity_task_completed(key, scheduled_event_id, result).await?,
        Err(error) => clients.respond_activity_task_failed(key, scheduled_event_id, error).await?,
    }
    Ok(())
}
