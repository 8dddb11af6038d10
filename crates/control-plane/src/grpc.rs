//! Tonic wiring: `linkflow_proto::ControlService` onto [`Membership`],
//! [`NamespaceStore`], and [`DynamicConfig`] (spec.md §4.5, §6 "Inter-
//! service RPC surface").

use std::sync::Arc;

use tonic::{Request, Response, Status};

use linkflow_proto::proto::{
    AllConfigRequest, AllConfigResponse, CreateNamespaceRequest, CreateNamespaceResponse,
    DeleteConfigRequest, DeleteConfigResponse, DeregisterServiceRequest, DeregisterServiceResponse,
    GetClusterRequest, GetClusterResponse, GetConfigRequest, GetConfigResponse,
    GetNamespaceRequest, GetNamespaceResponse, GetServiceInstancesRequest,
    GetServiceInstancesResponse, ListClustersRequest, ListClustersResponse, ListConfigRequest,
    ListConfigResponse, ListNamespacesRequest, ListNamespacesResponse, RegisterClusterRequest,
    RegisterClusterResponse, RegisterServiceRequest, RegisterServiceResponse,
    RemoveClusterRequest, RemoveClusterResponse, RouteRequestRequest, RouteRequestResponse,
    SendHeartbeatRequest, SendHeartbeatResponse, SetConfigRequest, SetConfigResponse,
    TriggerSyncRequest, TriggerSyncResponse, UpdateNamespaceRequest, UpdateNamespaceResponse,
};
use linkflow_proto::{from_json, to_json, ControlService};
use linkflow_types::{ClusterInfo, ClusterStatus, EngineError, Namespace};

use crate::dynamic_config::DynamicConfig;
use crate::membership::{Membership, ServiceInstance};
use crate::namespaces::NamespaceStore;
use crate::routing::route_request;

pub struct ControlGrpcService {
    membership: Arc<Membership>,
    namespaces: Arc<NamespaceStore>,
    config: Arc<DynamicConfig>,
}

impl ControlGrpcService {
    pub fn new(membership: Arc<Membership>, namespaces: Arc<NamespaceStore>, config: Arc<DynamicConfig>) -> Self {
        Self { membership, namespaces, config }
    }
}

/// Same category-to-status mapping History and Matching use (spec.md §7).
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
impl ControlService for ControlGrpcService {
    async fn register_cluster(
        &self,
        request: Request<RegisterClusterRequest>,
    ) -> Result<Response<RegisterClusterResponse>, Status> {
        let req = request.into_inner();
        let cluster: ClusterInfo = from_json(&req.cluster_json)?;
        self.membership.register_cluster(cluster);
        Ok(Response::new(RegisterClusterResponse {}))
    }

    async fn remove_cluster(
        &self,
        request: Request<RemoveClusterRequest>,
    ) -> Result<Response<RemoveClusterResponse>, Status> {
        let req = request.into_inner();
        self.membership.remove_cluster(&req.cluster_id).map_err(to_status)?;
        Ok(Response::new(RemoveClusterResponse {}))
    }

    async fn get_cluster(
        &self,
        request: Request<GetClusterRequest>,
    ) -> Result<Response<GetClusterResponse>, Status> {
        let req = request.into_inner();
        let cluster = self.membership.get_cluster(&req.cluster_id).map_err(to_status)?;
        Ok(Response::new(GetClusterResponse { cluster_json: to_json(&cluster)? }))
    }

    async fn list_clusters(
        &self,
        _request: Request<ListClustersRequest>,
    ) -> Result<Response<ListClustersResponse>, Status> {
        let clusters = self.membership.list_clusters();
        Ok(Response::new(ListClustersResponse { clusters_json: to_json(&clusters)? }))
    }

    async fn route_request(
        &self,
        request: Request<RouteRequestRequest>,
    ) -> Result<Response<RouteRequestResponse>, Status> {
        let req = request.into_inner();
        let cluster_id = route_request(&self.membership, &self.namespaces, &req.namespace_id, &req.workflow_id)
            .map_err(to_status)?;
        Ok(Response::new(RouteRequestResponse { cluster_id }))
    }

    async fn send_heartbeat(
        &self,
        request: Request<SendHeartbeatRequest>,
    ) -> Result<Response<SendHeartbeatResponse>, Status> {
        let req = request.into_inner();
        let last_heartbeat = chrono::DateTime::from_timestamp_millis(req.timestamp_unix_millis)
            .unwrap_or_else(chrono::Utc::now);
        let status = match req.status.as_str() {
            "degraded" => ClusterStatus::Degraded,
            "unhealthy" => ClusterStatus::Unhealthy,
            "offline" => ClusterStatus::Offline,
            _ => ClusterStatus::Healthy,
        };
        self.membership.record_heartbeat(ClusterInfo {
            cluster_id: req.cluster_id,
            name: req.name,
            region: req.region,
            endpoint: String::new(),
            status,
            last_heartbeat,
            metadata: req.metadata,
        });
        Ok(Response::new(SendHeartbeatResponse { status: "ok".into() }))
    }

    async fn trigger_sync(
        &self,
        _request: Request<TriggerSyncRequest>,
    ) -> Result<Response<TriggerSyncResponse>, Status> {
        let clusters = self.membership.list_clusters();
        let peers_contacted = clusters.len().saturating_sub(1) as u32;
        let peers_healthy = clusters
            .iter()
            .filter(|c| c.status == ClusterStatus::Healthy)
            .count() as u32;
        Ok(Response::new(TriggerSyncResponse { peers_contacted, peers_healthy }))
    }

    async fn get_config(
        &self,
        request: Request<GetConfigRequest>,
    ) -> Result<Response<GetConfigResponse>, Status> {
        let req = request.into_inner();
        let value = self.config.get(&req.key).map_err(to_status)?;
        Ok(Response::new(GetConfigResponse { value_json: to_json(&value)? }))
    }

    async fn set_config(
        &self,
        request: Request<SetConfigRequest>,
    ) -> Result<Response<SetConfigResponse>, Status> {
        let req = request.into_inner();
        let value = from_json(&req.value_json)?;
        self.config.set(&req.key, value);
        Ok(Response::new(SetConfigResponse {}))
    }

    async fn delete_config(
        &self,
        request: Request<DeleteConfigRequest>,
    ) -> Result<Response<DeleteConfigResponse>, Status> {
        let req = request.into_inner();
        self.config.delete(&req.key).map_err(to_status)?;
        Ok(Response::new(DeleteConfigResponse {}))
    }

    async fn list_config(
        &self,
        _request: Request<ListConfigRequest>,
    ) -> Result<Response<ListConfigResponse>, Status> {
        Ok(Response::new(ListConfigResponse { keys: self.config.list_keys() }))
    }

    async fn all_config(
        &self,
        _request: Request<AllConfigRequest>,
    ) -> Result<Response<AllConfigResponse>, Status> {
        Ok(Response::new(AllConfigResponse { values_json: to_json(&self.config.all())? }))
    }

    async fn create_namespace(
        &self,
        request: Request<CreateNamespaceRequest>,
    ) -> Result<Response<CreateNamespaceResponse>, Status> {
        let req = request.into_inner();
        let namespace: Namespace = from_json(&req.namespace_json)?;
        self.namespaces.create(namespace).map_err(to_status)?;
        Ok(Response::new(CreateNamespaceResponse {}))
    }

    async fn get_namespace(
        &self,
        request: Request<GetNamespaceRequest>,
    ) -> Result<Response<GetNamespaceResponse>, Status> {
        let req = request.into_inner();
        let namespace = self.namespaces.get(&req.namespace_id).map_err(to_status)?;
        Ok(Response::new(GetNamespaceResponse { namespace_json: to_json(&namespace)? }))
    }

    async fn update_namespace(
        &self,
        request: Request<UpdateNamespaceRequest>,
    ) -> Result<Response<UpdateNamespaceResponse>, Status> {
        let req = request.into_inner();
        let namespace: Namespace = from_json(&req.namespace_json)?;
        self.namespaces.update(namespace).map_err(to_status)?;
        Ok(Response::new(UpdateNamespaceResponse {}))
    }

    async fn list_namespaces(
        &self,
        _request: Request<ListNamespacesRequest>,
    ) -> Result<Response<ListNamespacesResponse>, Status> {
        Ok(Response::new(ListNamespacesResponse { namespaces_json: to_json(&self.namespaces.list())? }))
    }

    async fn register_service(
        &self,
        request: Request<RegisterServiceRequest>,
    ) -> Result<Response<RegisterServiceResponse>, Status> {
        let req = request.into_inner();
        self.membership.register_service(ServiceInstance {
            service_name: req.service_name,
            instance_id: req.instance_id,
            endpoint: req.endpoint,
        });
        Ok(Response::new(RegisterServiceResponse {}))
    }

    async fn deregister_service(
        &self,
        request: Request<DeregisterServiceRequest>,
    ) -> Result<Response<DeregisterServiceResponse>, Status> {
        let req = request.into_inner();
        self.membership.deregister_service(&req.service_name, &req.instance_id);
        Ok(Response::new(DeregisterServiceResponse {}))
    }

    async fn get_service_instances(
        &self,
        request: Request<GetServiceInstancesRequest>,
    ) -> Result<Response<GetServiceInstancesResponse>, Status> {
        let req = request.into_inner();
        let instances = self.membership.service_instances(&req.service_name);
        Ok(Response::new(GetServiceInstancesResponse { instances_json: to_json(&instances)? }))
    }
}
