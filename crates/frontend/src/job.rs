//! `JobPayload` — the wire shape read off the inbound work stream, and
//! its translation into a `StartWorkflowExecution` call (spec.md §4.3
//! steps 2-3).

use linkflow_types::{EventAttributes, ExecutionKey, TimeoutConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub job_id: String,
    pub callback_token: String,
    pub execution_id: String,
    pub workflow_id: String,
    pub workspace_id: String,
    pub partition: u32,
    pub priority: String,
    pub workflow: serde_json::Value,
    pub trigger_data: serde_json::Value,
    #[serde(default)]
    pub credentials: serde_json::Value,
    #[serde(default)]
    pub variables: serde_json::Value,
    pub callback_url: String,
    #[serde(default)]
    pub deterministic: bool,
}

/// The namespace/workflowID/taskQueue/requestID a `JobPayload` maps to
/// (spec.md §4.3 step 3, bit-exact naming convention).
pub struct StartWorkflowExecution {
    pub key: ExecutionKey,
    pub task_queue: String,
    pub attributes: EventAttributes,
}

impl JobPayload {
    /// `namespace="workspace-{id}"`, `workflowID="workflow-{id}"`,
    /// `taskQueue="workflows-{priority}"`, `requestID=jobID` (serves as
    /// runID — idempotent: replaying the same job re-targets the same run).
    pub fn into_start_request(self) -> StartWorkflowExecution {
        let namespace_id = format!("workspace-{}", self.workspace_id);
        let workflow_id = format!("workflow-{}", self.workflow_id);
        let task_queue = format!("workflows-{}", self.priority);
        let key = ExecutionKey::new(namespace_id, workflow_id, self.job_id);

        let input = serde_json::json!({
            "execution_id": self.execution_id,
            "workflow": self.workflow,
            "trigger_data": self.trigger_data,
            "credentials": self.credentials,
            "variables": self.variables,
            "callback_url": self.callback_url,
            "callback_token": self.callback_token,
            "deterministic": self.deterministic,
        });

        let attributes = EventAttributes::ExecutionStarted {
            workflow_type: "linkflow_job".into(),
            task_queue: task_queue.clone(),
            input,
            timeout_config: TimeoutConfig::default(),
        };

        StartWorkflowExecution { key, task_queue, attributes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JobPayload {
        JobPayload {
            job_id: "job-1".into(),
            callback_token: "tok".into(),
            execution_id: "exec-1".into(),
            workflow_id: "wf-1".into(),
            workspace_id: "ws-1".into(),
            partition: 3,
            priority: "high".into(),
            workflow: serde_json::json!({"steps": []}),
            trigger_data: serde_json::json!({}),
            credentials: serde_json::json!({}),
            variables: serde_json::json!({}),
            callback_url: "https://example.com/callback".into(),
            deterministic: true,
        }
    }

    #[test]
    fn start_request_applies_the_naming_convention() {
        let request = sample().into_start_request();
        assert_eq!(request.key.namespace_id, "workspace-ws-1");
        assert_eq!(request.key.workflow_id, "workflow-wf-1");
        assert_eq!(request.key.run_id, "job-1");
        assert_eq!(request.task_queue, "workflows-high");
    }

    #[test]
    fn job_payload_round_trips_through_json() {
        let json = serde_json::to_string(&sample()).unwrap();
        let decoded: JobPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.job_id, "job-1");
    }
}
