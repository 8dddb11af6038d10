//! Typed wrappers over the generated `ControlServiceClient` and
//! `MatchingServiceClient` so commands read as calls on named engine
//! operations rather than raw proto requests (mirrors
//! `linkflow-worker`'s `clients.rs`).

use linkflow_matching::dlq::DeadLetter;
use linkflow_proto::proto::{
    CreateNamespaceRequest, GetClusterRequest, GetNamespaceRequest, ListClustersRequest, ListDlqRequest,
    ListNamespacesRequest, PurgeDlqRequest, RemoveDlqTaskRequest, RetryDlqTaskRequest, UpdateNamespaceRequest,
};
use linkflow_proto::{from_json, to_json, ControlServiceClient, MatchingServiceClient};
use linkflow_types::{ClusterInfo, EngineError, Namespace};
use thiserror::Error;
use tonic::transport::Channel;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connecting to cluster: {0}")]
    Connect(#[from] tonic::transport::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

fn status_err(status: tonic::Status) -> ClientError {
    ClientError::Engine(EngineError::Other(anyhow::anyhow!(status)))
}

fn json_err(err: serde_json::Error) -> ClientError {
    ClientError::Engine(EngineError::Other(anyhow::anyhow!(err)))
}

#[derive(Clone)]
pub struct EngineClient {
    control: ControlServiceClient<Channel>,
    matching: MatchingServiceClient<Channel>,
}

impl EngineClient {
    pub async fn connect(control_addr: &str, matching_addr: &str) -> Result<Self, ClientError> {
        let control_channel = Channel::from_shared(control_addr.to_string())?.connect().await?;
        let matching_channel = Channel::from_shared(matching_addr.to_string())?.connect().await?;
        Ok(Self {
            control: ControlServiceClient::new(control_channel),
            matching: MatchingServiceClient::new(matching_channel),
        })
    }

    pub async fn list_dlq(&self) -> Result<Vec<DeadLetter>, ClientError> {
        let response = self.matching.clone().list_dlq(ListDlqRequest {}).await.map_err(status_err)?.into_inner();
        from_json(&response.entries_json).map_err(json_err)
    }

    pub async fn retry_dlq_task(&self, queue: &str, task_id: &str) -> Result<(), ClientError> {
        self.matching
            .clone()
            .retry_dlq_task(RetryDlqTaskRequest { queue: queue.to_string(), task_id: task_id.to_string() })
            .await
            .map_err(status_err)?;
        Ok(())
    }

    pub async fn remove_dlq_task(&self, task_id: &str) -> Result<(), ClientError> {
        self.matching
            .clone()
            .remove_dlq_task(RemoveDlqTaskRequest { task_id: task_id.to_string() })
            .await
            .map_err(status_err)?;
        Ok(())
    }

    pub async fn purge_dlq(&self) -> Result<u64, ClientError> {
        let response = self.matching.clone().purge_dlq(PurgeDlqRequest {}).await.map_err(status_err)?.into_inner();
        Ok(response.purged)
    }

    pub async fn create_namespace(&self, namespace: Namespace) -> Result<(), ClientError> {
        let namespace_json = to_json(&namespace).map_err(json_err)?;
        self.control.clone().create_namespace(CreateNamespaceRequest { namespace_json }).await.map_err(status_err)?;
        Ok(())
    }

    pub async fn get_namespace(&self, namespace_id: &str) -> Result<Namespace, ClientError> {
        let response = self
            .control
            .clone()
            .get_namespace(GetNamespaceRequest { namespace_id: namespace_id.to_string() })
            .await
            .map_err(status_err)?
            .into_inner();
        from_json(&response.namespace_json).map_err(json_err)
    }

    pub async fn update_namespace(&self, namespace: Namespace) -> Result<(), ClientError> {
        let namespace_json = to_json(&namespace).map_err(json_err)?;
        self.control.clone().update_namespace(UpdateNamespaceRequest { namespace_json }).await.map_err(status_err)?;
        Ok(())
    }

    pub async fn list_namespaces(&self) -> Result<Vec<Namespace>, ClientError> {
        let response =
            self.control.clone().list_namespaces(ListNamespacesRequest {}).await.map_err(status_err)?.into_inner();
        from_json(&response.namespaces_json).map_err(json_err)
    }

    pub async fn list_clusters(&self) -> Result<Vec<ClusterInfo>, ClientError> {
        let response =
            self.control.clone().list_clusters(ListClustersRequest {}).await.map_err(status_err)?.into_inner();
        from_json(&response.clusters_json).map_err(json_err)
    }

    pub async fn get_cluster(&self, cluster_id: &str) -> Result<ClusterInfo, ClientError> {
        let response = self
            .control
            .clone()
            .get_cluster(GetClusterRequest { cluster_id: cluster_id.to_string() })
            .await
            .map_err(status_err)?
            .into_inner();
        from_json(&response.cluster_json).map_err(json_err)
    }
}
