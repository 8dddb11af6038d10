//! Thin typed wrapper over the generated `HistoryServiceClient`, shared
//! by the stream consumer (ingestion) and the RPC facade (Signal/
//! Terminate/Query/Describe/List).

use chrono::{DateTime, Utc};
use linkflow_proto::proto::{
    GetMutableStateRequest, ListWorkflowExecutionsRequest, RecordEventRequest,
};
use linkflow_proto::{from_json, key_to_proto, to_json, HistoryServiceClient};
use linkflow_types::{EngineError, EventAttributes, ExecutionKey, MutableState};
use serde::{Deserialize, Serialize};
use tonic::transport::Channel;

/// Mirrors `linkflow_history::persistence::VisibilityRecord`'s wire
/// shape: the two crates don't share a dependency edge, only the
/// `executions_json` convention on `ListWorkflowExecutionsResponse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub key: ExecutionKey,
    pub workflow_type: String,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct HistoryClient {
    inner: HistoryServiceClient<Channel>,
}

impl HistoryClient {
    pub async fn connect(addr: &str) -> Result<Self, EngineError> {
        let channel = Channel::from_shared(addr.to_string())
            .map_err(|e| EngineError::Other(anyhow::anyhow!(e)))?
            .connect()
            .await
            .map_err(|e| EngineError::Other(anyhow::anyhow!(e)))?;
        Ok(Self { inner: HistoryServiceClient::new(channel) })
    }

    pub async fn record_event(&self, key: &ExecutionKey, attributes: EventAttributes) -> Result<u64, EngineError> {
        let event_attributes_json = to_json(&attributes).map_err(|e| EngineError::Other(anyhow::anyhow!(e)))?;
        let response = self
            .inner
            .clone()
            .record_event(RecordEventRequest {
                key: Some(key_to_proto(key)),
                event_attributes_json,
                task_id: None,
            })
            .await
            .map_err(|status| EngineError::Other(anyhow::anyhow!(status)))?
            .into_inner();
        Ok(response.event_id)
    }

    pub async fn get_mutable_state(&self, key: &ExecutionKey) -> Result<MutableState, EngineError> {
        let response = self
            .inner
            .clone()
            .get_mutable_state(GetMutableStateRequest { key: Some(key_to_proto(key)) })
            .await
            .map_err(|status| EngineError::Other(anyhow::anyhow!(status)))?
            .into_inner();
        from_json(&response.state_json).map_err(|e| EngineError::Other(anyhow::anyhow!(e)))
    }

    pub async fn list_workflow_executions(
        &self,
        namespace_id: &str,
        open_only: bool,
        page_size: u32,
    ) -> Result<Vec<ExecutionSummary>, EngineError> {
        let response = self
            .inner
            .clone()
            .list_workflow_executions(ListWorkflowExecutionsRequest {
                namespace_id: namespace_id.to_string(),
                open_only,
                page_size,
            })
            .await
            .map_err(|status| EngineError::Other(anyhow::anyhow!(status)))?
            .into_inner();
        from_json(&response.executions_json).map_err(|e| EngineError::Other(anyhow::anyhow!(e)))
    }
}
