use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;

use linkflow_frontend::config::Config;
use linkflow_frontend::facade::{self, FacadeState};
use linkflow_frontend::history_client::HistoryClient;
use linkflow_frontend::stream::StreamConsumer;
use linkflow_observability::ObservabilityConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("loading frontend configuration")?;

    let observability_config = ObservabilityConfig::from_env("linkflow-frontend");
    let _telemetry_guard = linkflow_observability::init(&observability_config)
        .context("initializing tracing/OpenTelemetry")?;

    tracing::info!(
        http_addr = %config.http_addr,
        owned_partitions = ?config.owned_partitions,
        "linkflow-frontend starting"
    );

    let history = Arc::new(
        HistoryClient::connect(&config.history_grpc_addr)
            .await
            .context("connecting to History service")?,
    );

    let consumer = StreamConsumer::connect(config.clone(), (*history).clone())
        .await
        .context("connecting to Redis")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_handles = consumer.spawn_all(shutdown_rx);

    let app = facade::routes(FacadeState { history: history.clone() });
    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .context("binding FRONTEND_HTTP_ADDR")?;

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("HTTP server exited")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal, draining stream consumers");
        }
    }

    let _ = shutdown_tx.send(true);
    for handle in consumer_handles {
        let _ = handle.await;
    }

    tracing::info!("linkflow-frontend shutdown complete");
    Ok(())
}
