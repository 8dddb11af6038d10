use anyhow::{Context, Result};

use linkflow_observability::ObservabilityConfig;
use linkflow_worker::{Config, EngineClients, Worker};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("loading worker configuration")?;

    let observability_config = ObservabilityConfig::from_env("linkflow-worker");
    let _telemetry_guard = linkflow_observability::init(&observability_config)
        .context("initializing tracing/OpenTelemetry")?;

    tracing::info!(
        identity = %config.identity,
        task_queues = ?config.task_queues,
        "linkflow-worker starting"
    );

    let clients = EngineClients::connect(&config.history_grpc_addr, &config.matching_grpc_addr)
        .await
        .context("connecting to History/Matching")?;

    // Deciders and node handlers are registered here by the embedding
    // application; this binary ships with empty registries, matching
    // spec.md §1's scoping of workflow/node business logic out of the
    // engine itself.
    let worker = Worker::new(clients, config);

    tokio::select! {
        _ = worker.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal, draining in-flight tasks");
            worker.shutdown();
        }
    }

    tracing::info!("linkflow-worker shutdown complete");
    Ok(())
}
