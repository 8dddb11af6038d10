//! The RPC facade (spec.md §4.3 "Other frontend operations"): a plain
//! HTTP surface in front of History, for callers that don't speak the
//! internal gRPC contract — Signal, Terminate, Query/Describe, List.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use linkflow_types::{EngineError, ErrorCategory, EventAttributes, ExecutionKey, WorkflowSignal};
use serde::{Deserialize, Serialize};

use crate::history_client::{ExecutionSummary, HistoryClient};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

fn status_for(err: &EngineError) -> StatusCode {
    match err.category() {
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::Capacity => StatusCode::TOO_MANY_REQUESTS,
        ErrorCategory::Ownership => StatusCode::FORBIDDEN,
        ErrorCategory::Availability => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCategory::Integrity => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn to_response(err: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = status_for(&err);
    (status, Json(ErrorResponse::new(err.to_string())))
}

#[derive(Clone)]
pub struct FacadeState {
    pub history: Arc<HistoryClient>,
}

pub fn routes(state: FacadeState) -> Router {
    Router::new()
        .route("/v1/namespaces/:namespace_id/workflows/:workflow_id/runs/:run_id/signal", post(signal))
        .route("/v1/namespaces/:namespace_id/workflows/:workflow_id/runs/:run_id/terminate", post(terminate))
        .route("/v1/namespaces/:namespace_id/workflows/:workflow_id/runs/:run_id", get(describe))
        .route("/v1/namespaces/:namespace_id/executions", get(list_executions))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SignalRequest {
    pub signal_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// POST .../signal — records a `SignalReceived` event; the decider
/// observes it on its next workflow task.
pub async fn signal(
    State(state): State<FacadeState>,
    Path((namespace_id, workflow_id, run_id)): Path<(String, String, String)>,
    Json(request): Json<SignalRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let key = ExecutionKey::new(namespace_id, workflow_id, run_id);
    let signal = WorkflowSignal::new(request.signal_type, request.payload);
    state
        .history
        .record_event(&key, EventAttributes::SignalReceived { signal })
        .await
        .map_err(to_response)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
pub struct TerminateRequest {
    #[serde(default = "default_reason")]
    pub reason: String,
    #[serde(default)]
    pub identity: String,
}

fn default_reason() -> String {
    "terminated via API".to_string()
}

/// POST .../terminate — records a terminal `ExecutionTerminated` event.
pub async fn terminate(
    State(state): State<FacadeState>,
    Path((namespace_id, workflow_id, run_id)): Path<(String, String, String)>,
    Json(request): Json<TerminateRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let key = ExecutionKey::new(namespace_id, workflow_id, run_id);
    state
        .history
        .record_event(
            &key,
            EventAttributes::ExecutionTerminated { reason: request.reason, identity: request.identity },
        )
        .await
        .map_err(to_response)?;
    Ok(StatusCode::ACCEPTED)
}

/// GET .../runs/{run_id} — describes an execution via its current
/// `MutableState` (also serves Query, since this engine exposes no
/// separate query-handler dispatch).
pub async fn describe(
    State(state): State<FacadeState>,
    Path((namespace_id, workflow_id, run_id)): Path<(String, String, String)>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let key = ExecutionKey::new(namespace_id, workflow_id, run_id);
    let state = state.history.get_mutable_state(&key).await.map_err(to_response)?;
    Ok(Json(serde_json::to_value(state).unwrap_or(serde_json::Value::Null)))
}

#[derive(Debug, Deserialize)]
pub struct ListExecutionsQuery {
    #[serde(default)]
    pub open_only: bool,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    100
}

/// GET .../executions — visibility listing for a namespace.
pub async fn list_executions(
    State(state): State<FacadeState>,
    Path(namespace_id): Path<String>,
    Query(query): Query<ListExecutionsQuery>,
) -> Result<Json<Vec<ExecutionSummary>>, (StatusCode, Json<ErrorResponse>)> {
    let executions = state
        .history
        .list_workflow_executions(&namespace_id, query.open_only, query.page_size)
        .await
        .map_err(to_response)?;
    Ok(Json(executions))
}
