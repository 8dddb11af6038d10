use std::sync::Arc;

use anyhow::{Context, Result};
use tonic::transport::Server;

use linkflow_history::config::Config;
use linkflow_history::engine::HistoryEngine;
use linkflow_history::grpc::HistoryGrpcService;
use linkflow_history::persistence::{
    InMemoryEventStore, InMemoryMutableStateStore, InMemoryVisibilityStore, PostgresEventStore,
    PostgresMutableStateStore, PostgresVisibilityStore,
};
use linkflow_history::shard::ShardController;
use linkflow_history::task_dispatch::GrpcTaskDispatcher;
use linkflow_observability::ObservabilityConfig;
use linkflow_proto::HistoryServiceServer;
use linkflow_proto::MatchingServiceClient;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("loading history service configuration")?;

    let observability_config = ObservabilityConfig::from_env("linkflow-history");
    let _telemetry_guard = linkflow_observability::init(&observability_config)
        .context("initializing tracing/OpenTelemetry")?;

    tracing::info!(grpc_addr = %config.grpc_addr, shard_count = config.shard_count, "linkflow-history starting");

    let matching_channel = tonic::transport::Channel::from_shared(config.matching_addr.clone())
        .context("invalid MATCHING_GRPC_ADDR")?
        .connect_lazy();
    let dispatcher = Arc::new(GrpcTaskDispatcher::new(MatchingServiceClient::new(
        matching_channel,
    )));

    let shards = ShardController::owning(config.shard_count, config.shard_range_start..config.shard_range_end);

    let engine = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(20)
                .connect(database_url)
                .await
                .context("connecting to Postgres")?;
            HistoryEngine::new(
                Arc::new(PostgresEventStore::new(pool.clone())),
                Arc::new(PostgresMutableStateStore::new(pool.clone())),
                Arc::new(PostgresVisibilityStore::new(pool)),
                dispatcher,
                shards,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL unset; using in-memory stores (development only)");
            HistoryEngine::new(
                Arc::new(InMemoryEventStore::new()),
                Arc::new(InMemoryMutableStateStore::new()),
                Arc::new(InMemoryVisibilityStore::new()),
                dispatcher,
                shards,
            )
        }
    };

    let addr = config.grpc_addr.parse().context("invalid HISTORY_GRPC_ADDR")?;
    let service = HistoryGrpcService::new(engine);

    tokio::select! {
        result = Server::builder()
            .add_service(HistoryServiceServer::new(service))
            .serve(addr) => {
            result.context("gRPC server exited")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal, draining in-flight requests");
        }
    }

    tracing::info!("linkflow-history shutdown complete");
    Ok(())
}
