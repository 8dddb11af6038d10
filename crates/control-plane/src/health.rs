//! Local health-checker (spec.md §4.5): ticks every 10s marking
//! clusters `offline` once `now - lastHeartbeat` exceeds `staleness`
//! (default 30s). Service instances follow the same rule but are not
//! separately timestamped in this workspace's `ServiceInstance`, so
//! only cluster membership is swept here.

use std::sync::Arc;
use std::time::Duration;

use crate::membership::Membership;

pub async fn run_health_check_loop(membership: Arc<Membership>, interval: Duration, staleness: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        membership.sweep_stale(staleness);
    }
}
