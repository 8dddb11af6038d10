//! Tonic wiring: `linkflow_proto::MatchingService` onto
//! [`MatchingManager`].

use std::sync::Arc;
use std::time::Duration;

use tonic::{Request, Response, Status};

use linkflow_proto::proto::{
    AddTaskRequest, AddTaskResponse, CompleteTaskRequest, CompleteTaskResponse, HeartbeatTaskRequest,
    HeartbeatTaskResponse, ListDlqRequest, ListDlqResponse, PollTaskRequest, PollTaskResponse,
    PurgeDlqRequest, PurgeDlqResponse, RemoveDlqTaskRequest, RemoveDlqTaskResponse, RetryDlqTaskRequest,
    RetryDlqTaskResponse,
};
use linkflow_proto::{from_json, to_json, MatchingService};
use linkflow_types::{EngineError, TaskToken};

use crate::manager::MatchingManager;

pub struct MatchingGrpcService {
    manager: Arc<MatchingManager>,
}

impl MatchingGrpcService {
    pub fn new(manager: Arc<MatchingManager>) -> Self {
        Self { manager }
    }
}

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
impl MatchingService for MatchingGrpcService {
    async fn add_task(&self, request: Request<AddTaskRequest>) -> Result<Response<AddTaskResponse>, Status> {
        let req = request.into_inner();
        let task = from_json(&req.task_json)?;
        let enqueued = self.manager.add_task(&req.queue, task).await.map_err(to_status)?;
        Ok(Response::new(AddTaskResponse { enqueued }))
    }

    async fn poll_task(&self, request: Request<PollTaskRequest>) -> Result<Response<PollTaskResponse>, Status> {
        let req = request.into_inner();
        let timeout = Duration::from_millis(req.timeout_millis);
        let polled = self
            .manager
            .poll_task(&req.queue, &req.identity, timeout)
            .await
            .map_err(to_status)?;

        match polled {
            Some((task, token)) => Ok(Response::new(PollTaskResponse {
                task_json: to_json(&Some(task))?,
                task_token: token.encode(),
            })),
            None => Ok(Response::new(PollTaskResponse {
                task_json: to_json::<Option<linkflow_types::Task>>(&None)?,
                task_token: String::new(),
            })),
        }
    }

    async fn complete_task(
        &self,
        request: Request<CompleteTaskRequest>,
    ) -> Result<Response<CompleteTaskResponse>, Status> {
        let req = request.into_inner();
        let token = TaskToken::parse(&req.task_token).map_err(to_status)?;
        self.manager.complete_task(&req.queue, &token).await.map_err(to_status)?;
        Ok(Response::new(CompleteTaskResponse {}))
    }

    async fn heartbeat_task(
        &self,
        request: Request<HeartbeatTaskRequest>,
    ) -> Result<Response<HeartbeatTaskResponse>, Status> {
        let req = request.into_inner();
        let token = TaskToken::parse(&req.task_token).map_err(to_status)?;
        let still_owned = self.manager.heartbeat_task(&req.queue, &token).await.map_err(to_status)?;
        Ok(Response::new(HeartbeatTaskResponse { still_owned }))
    }

    async fn list_dlq(&self, _request: Request<ListDlqRequest>) -> Result<Response<ListDlqResponse>, Status> {
        let entries_json = to_json(&self.manager.dlq_list())?;
        Ok(Response::new(ListDlqResponse { entries_json }))
    }

    async fn retry_dlq_task(
        &self,
        request: Request<RetryDlqTaskRequest>,
    ) -> Result<Response<RetryDlqTaskResponse>, Status> {
        let req = request.into_inner();
        self.manager.dlq_retry(&req.queue, &req.task_id).await.map_err(to_status)?;
        Ok(Response::new(RetryDlqTaskResponse {}))
    }

    async fn remove_dlq_task(
        &self,
        request: Request<RemoveDlqTaskRequest>,
    ) -> Result<Response<RemoveDlqTaskResponse>, Status> {
        let req = request.into_inner();
        self.manager.dlq_remove(&req.task_id).map_err(to_status)?;
        Ok(Response::new(RemoveDlqTaskResponse {}))
    }

    async fn purge_dlq(&self, _request: Request<PurgeDlqRequest>) -> Result<Response<PurgeDlqResponse>, Status> {
        let purged = self.manager.dlq_purge() as u64;
        Ok(Response::new(PurgeDlqResponse { purged }))
    }
}
