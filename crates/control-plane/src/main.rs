use std::sync::Arc;

use anyhow::{Context, Result};
use tonic::transport::Server;

use linkflow_control_plane::admin::{self, AdminState};
use linkflow_control_plane::config::Config;
use linkflow_control_plane::dynamic_config::DynamicConfig;
use linkflow_control_plane::grpc::ControlGrpcService;
use linkflow_control_plane::health::run_health_check_loop;
use linkflow_control_plane::heartbeat::run_heartbeat_loop;
use linkflow_control_plane::membership::Membership;
use linkflow_control_plane::namespaces::NamespaceStore;
use linkflow_observability::ObservabilityConfig;
use linkflow_proto::ControlServiceServer;
use linkflow_types::ClusterInfo;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("loading control-plane configuration")?;

    let observability_config = ObservabilityConfig::from_env("linkflow-control-plane");
    let _telemetry_guard = linkflow_observability::init(&observability_config)
        .context("initializing tracing/OpenTelemetry")?;

    tracing::info!(
        cluster_id = %config.cluster_id,
        peers = config.peer_endpoints.len(),
        "linkflow-control-plane starting"
    );

    let local = ClusterInfo::local(
        &config.cluster_id,
        &config.cluster_name,
        &config.cluster_region,
        &config.cluster_endpoint,
    );
    let membership = Arc::new(Membership::new(local.clone()));
    let namespaces = Arc::new(NamespaceStore::new());
    let dynamic_config = Arc::new(DynamicConfig::new());

    let health_task = tokio::spawn(run_health_check_loop(
        membership.clone(),
        config.health_check_interval,
        config.staleness,
    ));
    let heartbeat_task = tokio::spawn(run_heartbeat_loop(
        local,
        config.peer_endpoints.clone(),
        membership.clone(),
        config.heartbeat_interval,
        config.max_heartbeat_retries,
        config.heartbeat_timeout,
    ));

    let grpc_service = ControlGrpcService::new(membership.clone(), namespaces.clone(), dynamic_config.clone());
    let grpc_addr = config.grpc_addr.parse().context("invalid CONTROL_GRPC_ADDR")?;
    let grpc_task = tokio::spawn(async move {
        Server::builder()
            .add_service(ControlServiceServer::new(grpc_service))
            .serve(grpc_addr)
            .await
    });

    let admin_state = AdminState { membership, namespaces, config: dynamic_config };
    let app = admin::routes(admin_state);
    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .context("binding CONTROL_HTTP_ADDR")?;
    tracing::info!(grpc_addr = %config.grpc_addr, http_addr = %config.http_addr, "listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("HTTP admin server exited")?;
        }
        result = grpc_task => {
            result.context("gRPC task panicked")?.context("gRPC server exited")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    health_task.abort();
    heartbeat_task.abort();

    tracing::info!("linkflow-control-plane shutdown complete");
    Ok(())
}
