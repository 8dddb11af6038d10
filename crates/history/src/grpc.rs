//! Tonic wiring: `linkflow_proto::HistoryService` onto [`HistoryEngine`].
//!
//! Every RPC unwraps its `_json` payload, calls the engine, and maps
//! `EngineError` onto a `tonic::Status` — the service-boundary
//! conversion named in SPEC_FULL.md §1 "Error handling".

use tonic::{Request, Response, Status};

use linkflow_proto::proto::{
    GetHistoryRequest, GetHistoryResponse, GetMutableStateRequest, GetMutableStateResponse,
    ListWorkflowExecutionsRequest, ListWorkflowExecutionsResponse, RecordEventRequest,
    RecordEventResponse, ResetExecutionRequest, ResetExecutionResponse,
    RespondActivityTaskCompletedRequest, RespondActivityTaskCompletedResponse,
    RespondActivityTaskFailedRequest, RespondActivityTaskFailedResponse,
    RespondWorkflowTaskCompletedRequest, RespondWorkflowTaskCompletedResponse,
};
use linkflow_proto::{from_json, key_from_proto_opt, to_json, HistoryService};
use linkflow_types::EngineError;

use crate::engine::HistoryEngine;

pub struct HistoryGrpcService {
    engine: HistoryEngine,
}

impl HistoryGrpcService {
    pub fn new(engine: HistoryEngine) -> Self {
        Self { engine }
    }
}

/// The engine's internal taxonomy maps onto gRPC status codes via each
/// variant's error category (spec.md §7).
fn to_status(err: EngineError) -> Status {
    use linkflow_types::ErrorCategory::*;
    let message = err.to_string();
    match err.category() {
        NotFound => Status::not_found(message),
        Conflict => Status::already_exists(message),
        Validation => Status::invalid_argument(message),
        Capacity => Status::resource_exhausted(message),
        Ownership => Status::failed_precondition(message),
        Availability => Status::unavailable(message),
        Integrity => Status::data_loss(message),
    }
}

#[tonic::async_trait]
impl HistoryService for HistoryGrpcService {
    async fn record_event(
        &self,
        request: Request<RecordEventRequest>,
    ) -> Result<Response<RecordEventResponse>, Status> {
        let req = request.into_inner();
        let key = key_from_proto_opt(req.key.as_ref())?;
        let attributes = from_json(&req.event_attributes_json)?;
        let event_id = self
            .engine
            .record_event(&key, attributes)
            .await
            .map_err(to_status)?;
        Ok(Response::new(RecordEventResponse { event_id }))
    }

    async fn get_history(
        &self,
        request: Request<GetHistoryRequest>,
    ) -> Result<Response<GetHistoryResponse>, Status> {
        let req = request.into_inner();
        let key = key_from_proto_opt(req.key.as_ref())?;
        let events = self
            .engine
            .get_history(&key, req.first_event_id, req.last_event_id)
            .await
            .map_err(to_status)?;
        let events_json = to_json(&events)?;
        Ok(Response::new(GetHistoryResponse { events_json }))
    }

    async fn get_mutable_state(
        &self,
        request: Request<GetMutableStateRequest>,
    ) -> Result<Response<GetMutableStateResponse>, Status> {
        let req = request.into_inner();
        let key = key_from_proto_opt(req.key.as_ref())?;
        let state = self.engine.get_mutable_state(&key).await.map_err(to_status)?;
        let state_json = to_json(&state)?;
        Ok(Response::new(GetMutableStateResponse { state_json }))
    }

    async fn respond_workflow_task_completed(
        &self,
        request: Request<RespondWorkflowTaskCompletedRequest>,
    ) -> Result<Response<RespondWorkflowTaskCompletedResponse>, Status> {
        let req = request.into_inner();
        let key = key_from_proto_opt(req.key.as_ref())?;
        let commands = from_json(&req.commands_json)?;
        self.engine
            .respond_workflow_task_completed(&key, commands)
            .await
            .map_err(to_status)?;
        Ok(Response::new(RespondWorkflowTaskCompletedResponse {}))
    }

    async fn respond_activity_task_completed(
        &self,
        request: Request<RespondActivityTaskCompletedRequest>,
    ) -> Result<Response<RespondActivityTaskCompletedResponse>, Status> {
        let req = request.into_inner();
        let key = key_from_proto_opt(req.key.as_ref())?;
        let result = from_json(&req.result_json)?;
        self.engine
            .respond_activity_task_completed(&key, req.scheduled_event_id, result)
            .await
            .map_err(to_status)?;
        Ok(Response::new(RespondActivityTaskCompletedResponse {}))
    }

    async fn respond_activity_task_failed(
        &self,
        request: Request<RespondActivityTaskFailedRequest>,
    ) -> Result<Response<RespondActivityTaskFailedResponse>, Status> {
        let req = request.into_inner();
        let key = key_from_proto_opt(req.key.as_ref())?;
        let error = from_json(&req.error_json)?;
        // The retry decision is History's: it classifies `error.retryable`
        // against the node's own `RetryPolicy` and attempt count.
        self.engine
            .respond_activity_task_failed(&key, req.scheduled_event_id, error)
            .await
            .map_err(to_status)?;
        Ok(Response::new(RespondActivityTaskFailedResponse {}))
    }

    async fn reset_execution(
        &self,
        request: Request<ResetExecutionRequest>,
    ) -> Result<Response<ResetExecutionResponse>, Status> {
        let req = request.into_inner();
        let key = key_from_proto_opt(req.key.as_ref())?;
        let new_key = self
            .engine
            .reset_execution(&key, &req.reason, req.reset_event_id)
            .await
            .map_err(to_status)?;
        Ok(Response::new(ResetExecutionResponse {
            new_run_id: new_key.run_id,
        }))
    }

    async fn list_workflow_executions(
        &self,
        request: Request<ListWorkflowExecutionsRequest>,
    ) -> Result<Response<ListWorkflowExecutionsResponse>, Status> {
        let req = request.into_inner();
        let executions = self
            .engine
            .list_workflow_executions(&req.namespace_id, req.open_only, req.page_size as usize)
            .await
            .map_err(to_status)?;
        let executions_json = to_json(&executions)?;
        Ok(Response::new(ListWorkflowExecutionsResponse { executions_json }))
    }
}
