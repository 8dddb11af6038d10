//! Cross-cluster heartbeat (spec.md §4.5): a ticker iterates configured
//! peer clusters concurrently, sending `SendHeartbeat` with linear
//! backoff, merging each peer's own cluster view by recency.

use std::sync::Arc;
use std::time::Duration;

use linkflow_proto::proto::SendHeartbeatRequest;
use linkflow_proto::ControlServiceClient;
use linkflow_types::{linear_delay, ClusterInfo};
use tonic::transport::Channel;
use tracing::{info, warn};

use crate::membership::Membership;

pub async fn run_heartbeat_loop(
    local: ClusterInfo,
    peers: Vec<String>,
    membership: Arc<Membership>,
    interval: Duration,
    max_retries: u32,
    per_peer_timeout: Duration,
) {
    if peers.is_empty() {
        return;
    }
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let futures = peers.iter().map(|endpoint| {
            heartbeat_one(local.clone(), endpoint.clone(), membership.clone(), max_retries, per_peer_timeout)
        });
        futures::future::join_all(futures).await;
    }
}

async fn heartbeat_one(
    local: ClusterInfo,
    endpoint: String,
    membership: Arc<Membership>,
    max_retries: u32,
    per_peer_timeout: Duration,
) {
    let request = SendHeartbeatRequest {
        cluster_id: local.cluster_id.clone(),
        name: local.name.clone(),
        region: local.region.clone(),
        status: "healthy".to_string(),
        timestamp_unix_millis: chrono::Utc::now().timestamp_millis(),
        metadata: local.metadata.clone(),
    };

    let mut attempt = 0;
    loop {
        attempt += 1;
        match send_heartbeat(&endpoint, request.clone(), per_peer_timeout).await {
            Ok(()) => {
                let mut peer = local.clone();
                peer.cluster_id = endpoint_cluster_id(&endpoint);
                membership.record_heartbeat(peer);
                return;
            }
            Err(e) if attempt >= max_retries => {
                warn!(endpoint, attempts = attempt, error = %e, "heartbeat exhausted retries, degrading peer");
                let cluster_id = endpoint_cluster_id(&endpoint);
                if membership.get_cluster(&cluster_id).is_ok() {
                    membership.mark_degraded(&cluster_id);
                } else {
                    membership.mark_offline(&cluster_id);
                }
                return;
            }
            Err(e) => {
                info!(endpoint, attempt, error = %e, "heartbeat attempt failed, retrying");
                tokio::time::sleep(linear_delay(attempt, Duration::from_millis(100), Duration::from_secs(5))).await;
            }
        }
    }
}

/// Peer clusters are addressed by gRPC endpoint in config; this
/// derives a stable membership key from it until the peer's own
/// `SendHeartbeat` has been observed once and recorded its real
/// `cluster_id`.
fn endpoint_cluster_id(endpoint: &str) -> String {
    endpoint.trim_start_matches("http://").trim_start_matches("https://").to_string()
}

async fn send_heartbeat(endpoint: &str, request: SendHeartbeatRequest, timeout: Duration) -> anyhow::Result<()> {
    let channel = Channel::from_shared(endpoint.to_string())?.connect().await?;
    let mut client = ControlServiceClient::new(channel);
    tokio::time::timeout(timeout, client.send_heartbeat(request)).await??;
    Ok(())
}
