//! Namespace/cluster/config admin HTTP surface (SPEC_FULL.md §2
//! "Namespace CRUD HTTP/RPC"): the control plane's own admin surface,
//! in addition to the internal RPC surface `grpc.rs` exposes, since
//! the external REST management surface named out-of-scope in spec.md
//! §1 is a different system and this one otherwise has no HTTP entry
//! point.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use linkflow_types::{ClusterInfo, EngineError, ErrorCategory, Namespace};

use crate::dynamic_config::DynamicConfig;
use crate::membership::Membership;
use crate::namespaces::NamespaceStore;

#[derive(Clone)]
pub struct AdminState {
    pub membership: Arc<Membership>,
    pub namespaces: Arc<NamespaceStore>,
    pub config: Arc<DynamicConfig>,
}

fn to_status_code(err: &EngineError) -> StatusCode {
    match err.category() {
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::Capacity => StatusCode::TOO_MANY_REQUESTS,
        ErrorCategory::Ownership => StatusCode::PRECONDITION_FAILED,
        ErrorCategory::Availability => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCategory::Integrity => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_err(err: EngineError) -> (StatusCode, Json<ErrorBody>) {
    let code = to_status_code(&err);
    (code, Json(ErrorBody { error: err.to_string() }))
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateNamespaceRequest {
    pub id: String,
    pub name: String,
    pub default_cluster: String,
}

pub async fn create_namespace(
    State(state): State<AdminState>,
    Json(req): Json<CreateNamespaceRequest>,
) -> Result<(StatusCode, Json<Namespace>), (StatusCode, Json<ErrorBody>)> {
    let namespace = Namespace::new(req.id, req.name, req.default_cluster);
    state.namespaces.create(namespace.clone()).map_err(api_err)?;
    Ok((StatusCode::CREATED, Json(namespace)))
}

pub async fn get_namespace(
    State(state): State<AdminState>,
    Path(namespace_id): Path<String>,
) -> Result<Json<Namespace>, (StatusCode, Json<ErrorBody>)> {
    state.namespaces.get(&namespace_id).map(Json).map_err(api_err)
}

pub async fn update_namespace(
    State(state): State<AdminState>,
    Path(namespace_id): Path<String>,
    Json(mut namespace): Json<Namespace>,
) -> Result<Json<Namespace>, (StatusCode, Json<ErrorBody>)> {
    namespace.id = namespace_id;
    state.namespaces.update(namespace.clone()).map_err(api_err)?;
    Ok(Json(namespace))
}

pub async fn list_namespaces(State(state): State<AdminState>) -> Json<Vec<Namespace>> {
    Json(state.namespaces.list())
}

pub async fn list_clusters(State(state): State<AdminState>) -> Json<Vec<ClusterInfo>> {
    Json(state.membership.list_clusters())
}

pub async fn get_cluster(
    State(state): State<AdminState>,
    Path(cluster_id): Path<String>,
) -> Result<Json<ClusterInfo>, (StatusCode, Json<ErrorBody>)> {
    state.membership.get_cluster(&cluster_id).map(Json).map_err(api_err)
}

#[derive(Deserialize, ToSchema)]
pub struct SetConfigRequest {
    pub value: serde_json::Value,
}

pub async fn get_config(
    State(state): State<AdminState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorBody>)> {
    state.config.get(&key).map(Json).map_err(api_err)
}

pub async fn set_config(
    State(state): State<AdminState>,
    Path(key): Path<String>,
    Json(req): Json<SetConfigRequest>,
) -> StatusCode {
    state.config.set(&key, req.value);
    StatusCode::NO_CONTENT
}

pub async fn delete_config(
    State(state): State<AdminState>,
    Path(key): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    state.config.delete(&key).map_err(api_err)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_config(State(state): State<AdminState>) -> Json<Vec<String>> {
    Json(state.config.list_keys())
}

pub fn routes(state: AdminState) -> Router {
    Router::new()
        .route("/v1/namespaces", post(create_namespace).get(list_namespaces))
        .route(
            "/v1/namespaces/:namespace_id",
            get(get_namespace).put(update_namespace),
        )
        .route("/v1/clusters", get(list_clusters))
        .route("/v1/clusters/:cluster_id", get(get_cluster))
        .route("/v1/config", get(list_config))
        .route(
            "/v1/config/:key",
            get(get_config).put(set_config).delete(delete_config),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> AdminState {
        AdminState {
            membership: Arc::new(Membership::new(ClusterInfo::local("c1", "c1", "us-east-1", "http://c1"))),
            namespaces: Arc::new(NamespaceStore::new()),
            config: Arc::new(DynamicConfig::new()),
        }
    }

    #[tokio::test]
    async fn create_then_get_namespace_round_trips() {
        let app = routes(state());
        let body = serde_json::json!({"id": "ns1", "name": "Production", "default_cluster": "c1"});
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/namespaces")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/namespaces/ns1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn list_clusters_includes_local() {
        let app = routes(state());
        let response = app
            .oneshot(Request::builder().uri("/v1/clusters").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
