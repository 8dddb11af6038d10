//! Internal gRPC protocol for History / Matching / Control.
//!
//! Decision: JSON-encode complex domain payloads (events, tasks, commands,
//! mutable state) into a single `_json` field rather than mirroring every
//! `linkflow-types` enum variant as a proto message — `linkflow-types`
//! remains the source of truth and this schema only changes when an RPC
//! itself changes shape.

use linkflow_types::ExecutionKey;

// Generated protobuf code
pub mod proto {
    tonic::include_proto!("linkflow.internal");
}

pub use proto::control_service_client::ControlServiceClient;
pub use proto::control_service_server::{ControlService, ControlServiceServer};
pub use proto::history_service_client::HistoryServiceClient;
pub use proto::history_service_server::{HistoryService, HistoryServiceServer};
pub use proto::matching_service_client::MatchingServiceClient;
pub use proto::matching_service_server::{MatchingService, MatchingServiceServer};

#[derive(Debug)]
pub enum ConversionError {
    MissingField(&'static str),
    Json(serde_json::Error),
}

impl std::fmt::Display for ConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::Json(e) => write!(f, "json conversion error: {e}"),
        }
    }
}

impl std::error::Error for ConversionError {}

impl From<serde_json::Error> for ConversionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<ConversionError> for tonic::Status {
    fn from(e: ConversionError) -> Self {
        tonic::Status::invalid_argument(e.to_string())
    }
}

pub fn key_to_proto(key: &ExecutionKey) -> proto::ExecutionKey {
    proto::ExecutionKey {
        namespace_id: key.namespace_id.clone(),
        workflow_id: key.workflow_id.clone(),
        run_id: key.run_id.clone(),
    }
}

pub fn key_from_proto(key: &proto::ExecutionKey) -> ExecutionKey {
    ExecutionKey::new(
        key.namespace_id.clone(),
        key.workflow_id.clone(),
        key.run_id.clone(),
    )
}

pub fn key_from_proto_opt(
    key: Option<&proto::ExecutionKey>,
) -> Result<ExecutionKey, ConversionError> {
    key.map(key_from_proto)
        .ok_or(ConversionError::MissingField("key"))
}

/// Encode any serializable domain value to the wire `_json` representation.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ConversionError> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a wire `_json` field back into a domain value.
pub fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, ConversionError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_key_round_trips_through_proto() {
        let key = ExecutionKey::new("ns1", "wf1", "run1");
        let proto_key = key_to_proto(&key);
        let back = key_from_proto(&proto_key);
        assert_eq!(key, back);
    }

    #[test]
    fn json_helpers_round_trip_a_task() {
        use linkflow_types::{Task, TaskType};
        let key = ExecutionKey::new("ns", "wf", "run1");
        let task = Task::new(key, TaskType::ActivityTask, 4, serde_json::json!({"a": 1}));
        let encoded = to_json(&task).unwrap();
        let decoded: Task = from_json(&encoded).unwrap();
        assert_eq!(task, decoded);
    }
}
