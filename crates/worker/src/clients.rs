//! Thin typed wrappers over the generated `HistoryServiceClient` and
//! `MatchingServiceClient` so `worker.rs` reads as calls on the engine's
//! named operations (spec.md §4.4) rather than raw proto requests.

use std::time::Duration;

use linkflow_proto::proto::{
    CompleteTaskRequest, GetMutableStateRequest, HeartbeatTaskRequest, PollTaskRequest,
    RespondActivityTaskCompletedRequest, RespondActivityTaskFailedRequest,
    RespondWorkflowTaskCompletedRequest,
};
use linkflow_proto::{from_json, key_to_proto, to_json, HistoryServiceClient, MatchingServiceClient};
use linkflow_types::{EngineError, ExecutionKey, MutableState, NodeError, Task, TaskToken, WorkflowCommand};
use tonic::transport::Channel;

#[derive(Clone)]
pub struct EngineClients {
    history: HistoryServiceClient<Channel>,
    matching: MatchingServiceClient<Channel>,
}

impl EngineClients {
    pub async fn connect(history_addr: &str, matching_addr: &str) -> Result<Self, EngineError> {
        let history_channel = Channel::from_shared(history_addr.to_string())
            .map_err(|e| EngineError::Other(anyhow::anyhow!(e)))?
            .connect()
            .await
            .map_err(|e| EngineError::Other(anyhow::anyhow!(e)))?;
        let matching_channel = Channel::from_shared(matching_addr.to_string())
            .map_err(|e| EngineError::Other(anyhow::anyhow!(e)))?
            .connect()
            .await
            .map_err(|e| EngineError::Other(anyhow::anyhow!(e)))?;
        Ok(Self {
            history: HistoryServiceClient::new(history_channel),
            matching: MatchingServiceClient::new(matching_channel),
        })
    }

    /// `PollTask(queue, identity)` — blocks up to `timeout`. Returns
    /// `None` on an empty poll (spec.md §4.4 step 1).
    pub async fn poll_task(
        &self,
        queue: &str,
        identity: &str,
        timeout: Duration,
    ) -> Result<Option<(Task, TaskToken)>, EngineError> {
        let response = self
            .matching
            .clone()
            .poll_task(PollTaskRequest {
                queue: queue.to_string(),
                identity: identity.to_string(),
                timeout_millis: timeout.as_millis() as u64,
            })
            .await
            .map_err(|status| EngineError::Other(anyhow::anyhow!(status)))?
            .into_inner();

        if response.task_token.is_empty() {
            return Ok(None);
        }
        let task: Option<Task> = from_json(&response.task_json).map_err(|e| EngineError::Other(anyhow::anyhow!(e)))?;
        let token = TaskToken::parse(&response.task_token)?;
        Ok(task.map(|t| (t, token)))
    }

    pub async fn complete_task(&self, queue: &str, token: &TaskToken) -> Result<(), EngineError> {
        self.matching
            .clone()
            .complete_task(CompleteTaskRequest {
                queue: queue.to_string(),
                task_token: token.encode(),
            })
            .await
            .map_err(|status| EngineError::Other(anyhow::anyhow!(status)))?;
        Ok(())
    }

    pub async fn heartbeat_task(&self, queue: &str, token: &TaskToken) -> Result<bool, EngineError> {
        let response = self
            .matching
            .clone()
            .heartbeat_task(HeartbeatTaskRequest {
                queue: queue.to_string(),
                task_token: token.encode(),
            })
            .await
            .map_err(|status| EngineError::Other(anyhow::anyhow!(status)))?
            .into_inner();
        Ok(response.still_owned)
    }

    pub async fn get_mutable_state(&self, key: &ExecutionKey) -> Result<MutableState, EngineError> {
        let response = self
            .history
            .clone()
            .get_mutable_state(GetMutableStateRequest { key: Some(key_to_proto(key)) })
            .await
            .map_err(|status| EngineError::Other(anyhow::anyhow!(status)))?
            .into_inner();
        from_json(&response.state_json).map_err(|e| EngineError::Other(anyhow::anyhow!(e)))
    }

    pub async fn respond_workflow_task_completed(
        &self,
        key: &ExecutionKey,
        task_token: &TaskToken,
        commands: Vec<WorkflowCommand>,
    ) -> Result<(), EngineError> {
        let commands_json = to_json(&commands).map_err(|e| EngineError::Other(anyhow::anyhow!(e)))?;
        self.history
            .clone()
            .respond_workflow_task_completed(RespondWorkflowTaskCompletedRequest {
                key: Some(key_to_proto(key)),
                task_token: task_token.encode(),
                commands_json,
            })
            .await
            .map_err(|status| EngineError::Other(anyhow::anyhow!(status)))?;
        Ok(())
    }

    pub async fn respond_activity_task_completed(
        &self,
        key: &ExecutionKey,
        scheduled_event_id: u64,
        result: serde_json::Value,
    ) -> Result<(), EngineError> {
        let result_json = to_json(&result).map_err(|e| EngineError::Other(anyhow::anyhow!(e)))?;
        self.history
            .clone()
            .respond_activity_task_completed(RespondActivityTaskCompletedRequest {
                key: Some(key_to_proto(key)),
                scheduled_event_id,
                result_json,
            })
            .await
            .map_err(|status| EngineError::Other(anyhow::anyhow!(status)))?;
        Ok(())
    }

    pub async fn respond_activity_task_failed(
        &self,
        key: &ExecutionKey,
        scheduled_event_id: u64,
        error: NodeError,
    ) -> Result<(), EngineError> {
        let error_json = to_json(&error).map_err(|e| EngineError::Other(anyhow::anyhow!(e)))?;
        self.history
            .clone()
            .respond_activity_task_failed(RespondActivityTaskFailedRequest {
                key: Some(key_to_proto(key)),
                scheduled_event_id,
                error_json,
            })
            .await
            .map_err(|status| EngineError::Other(anyhow::anyhow!(status)))?;
        Ok(())
    }
}
