use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tonic::transport::Server;

use linkflow_matching::config::Config;
use linkflow_matching::grpc::MatchingGrpcService;
use linkflow_matching::manager::MatchingManager;
use linkflow_matching::partition::PartitionRing;
use linkflow_observability::ObservabilityConfig;
use linkflow_proto::MatchingServiceServer;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("loading matching service configuration")?;

    let observability_config = ObservabilityConfig::from_env("linkflow-matching");
    let _telemetry_guard = linkflow_observability::init(&observability_config)
        .context("initializing tracing/OpenTelemetry")?;

    tracing::info!(
        grpc_addr = %config.grpc_addr,
        partition_count = config.partition_count,
        owned_partitions = ?config.owned_partitions,
        "linkflow-matching starting"
    );

    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL set but this binary wires only the in-memory TaskStore; see linkflow_matching::store::RedisTaskStore for queue-by-queue opt-in");
    }

    let ring = PartitionRing::new(config.partition_count, 100);
    let manager = Arc::new(MatchingManager::new(
        config.namespace.clone(),
        ring,
        config.owned_partitions.clone(),
        config.wal_dir.clone().map(PathBuf::from),
    ));

    let reaper_interval = Duration::from_millis(config.reaper_interval_millis);
    let reaper_handle = {
        let manager = manager.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(reaper_interval);
            loop {
                ticker.tick().await;
                match manager.requeue_expired_tasks().await {
                    Ok(count) if count > 0 => tracing::info!(count, "reclaimed expired task leases"),
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "lease reaper sweep failed"),
                }
            }
        })
    };

    let addr = config.grpc_addr.parse().context("invalid MATCHING_GRPC_ADDR")?;
    let service = MatchingGrpcService::new(manager);

    tokio::select! {
        result = Server::builder()
            .add_service(MatchingServiceServer::new(service))
            .serve(addr) => {
            result.context("gRPC server exited")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal, draining in-flight requests");
        }
    }

    reaper_handle.abort();
    tracing::info!("linkflow-matching shutdown complete");
    Ok(())
}
