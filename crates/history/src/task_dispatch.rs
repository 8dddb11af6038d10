//! Outbound calls from History to Matching (spec.md §4.1 step 6, "Matching
//! `AddTask` call for scheduling-triggering events").
//!
//! History never holds a queue itself — it only decides which task to
//! emit and hands it to whatever implements this trait. Production
//! wires this to a `MatchingServiceClient` over the internal RPC
//! surface (`linkflow-proto`); tests use the in-memory recorder below.

use async_trait::async_trait;
use linkflow_types::{Result, Task};
use tonic::transport::Channel;

#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn add_task(&self, queue: &str, task: Task) -> Result<()>;
}

/// Records every dispatched task in order; used by `engine` unit tests
/// to assert the task-emission table (spec.md §4.1) without standing up
/// a Matching service.
#[derive(Default)]
pub struct RecordingDispatcher {
    tasks: parking_lot::Mutex<Vec<(String, Task)>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> Vec<(String, Task)> {
        self.tasks.lock().clone()
    }
}

#[async_trait]
impl TaskDispatcher for RecordingDispatcher {
    async fn add_task(&self, queue: &str, task: Task) -> Result<()> {
        self.tasks.lock().push((queue.to_string(), task));
        Ok(())
    }
}

/// Dispatches over the internal gRPC surface to a Matching instance.
pub struct GrpcTaskDispatcher {
    client: linkflow_proto::MatchingServiceClient<Channel>,
}

impl GrpcTaskDispatcher {
    pub fn new(client: linkflow_proto::MatchingServiceClient<Channel>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TaskDispatcher for GrpcTaskDispatcher {
    async fn add_task(&self, queue: &str, task: Task) -> Result<()> {
        let task_json = linkflow_proto::to_json(&task)
            .map_err(|e| linkflow_types::EngineError::Store(e.to_string()))?;
        let request = tonic::Request::new(linkflow_proto::proto::AddTaskRequest {
            queue: queue.to_string(),
            task_json,
        });
        self.client
            .clone()
            .add_task(request)
            .await
            .map_err(|status| linkflow_types::EngineError::Store(status.to_string()))?;
        Ok(())
    }
}
