//! Cluster membership and federation entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ClusterStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClusterInfo {
    pub cluster_id: String,
    pub name: String,
    pub region: String,
    pub endpoint: String,
    pub status: ClusterStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub metadata: std::collections::HashMap<String, String>,
}

impl ClusterInfo {
    pub fn local(cluster_id: impl Into<String>, name: impl Into<String>, region: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            name: name.into(),
            region: region.into(),
            endpoint: endpoint.into(),
            status: ClusterStatus::Healthy,
            last_heartbeat: Utc::now(),
            metadata: std::collections::HashMap::new(),
        }
    }

    /// Whether this cluster should be considered offline given the
    /// current time and the membership staleness threshold (default
    /// 30s, spec.md §4.5).
    pub fn is_stale(&self, now: DateTime<Utc>, staleness: chrono::Duration) -> bool {
        now - self.last_heartbeat > staleness
    }
}

/// A remote engine cluster participating in heartbeat-driven
/// federation, as seen from the local cluster's perspective.
pub type PeerCluster = ClusterInfo;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_cluster_starts_healthy() {
        let c = ClusterInfo::local("c1", "primary", "us-east-1", "https://c1.internal:7233");
        assert_eq!(c.status, ClusterStatus::Healthy);
    }

    #[test]
    fn staleness_detection() {
        let mut c = ClusterInfo::local("c1", "primary", "us-east-1", "http://x");
        c.last_heartbeat = Utc::now() - chrono::Duration::seconds(40);
        assert!(c.is_stale(Utc::now(), chrono::Duration::seconds(30)));
    }
}
