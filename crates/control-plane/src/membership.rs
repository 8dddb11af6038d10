//! In-memory cluster membership and service registry (spec.md §4.5).
//! Two separate locks — one here for membership/services, a second in
//! [`crate::dynamic_config`] for config — so config reads never
//! contend with the hot membership path (spec.md §5 "Locking discipline").

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use linkflow_types::{ClusterInfo, ClusterStatus, EngineError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceInstance {
    pub service_name: String,
    pub instance_id: String,
    pub endpoint: String,
}

pub struct Membership {
    clusters: RwLock<HashMap<String, ClusterInfo>>,
    services: RwLock<HashMap<String, Vec<ServiceInstance>>>,
}

impl Membership {
    /// Registers `local` as healthy, matching the `Start` behavior in
    /// spec.md §4.5.
    pub fn new(local: ClusterInfo) -> Self {
        let mut clusters = HashMap::new();
        clusters.insert(local.cluster_id.clone(), local);
        Self { clusters: RwLock::new(clusters), services: RwLock::new(HashMap::new()) }
    }

    pub fn register_cluster(&self, cluster: ClusterInfo) {
        self.clusters.write().insert(cluster.cluster_id.clone(), cluster);
    }

    pub fn remove_cluster(&self, cluster_id: &str) -> Result<(), EngineError> {
        self.clusters
            .write()
            .remove(cluster_id)
            .map(|_| ())
            .ok_or_else(|| EngineError::ClusterNotFound(cluster_id.to_string()))
    }

    pub fn get_cluster(&self, cluster_id: &str) -> Result<ClusterInfo, EngineError> {
        self.clusters
            .read()
            .get(cluster_id)
            .cloned()
            .ok_or_else(|| EngineError::ClusterNotFound(cluster_id.to_string()))
    }

    pub fn list_clusters(&self) -> Vec<ClusterInfo> {
        self.clusters.read().values().cloned().collect()
    }

    /// Applies a peer's reported heartbeat: merges its status and
    /// `last_heartbeat`, creating the entry if unseen. Last-writer-wins
    /// is enforced by the caller only recording heartbeats newer than
    /// what's already stored.
    pub fn record_heartbeat(&self, info: ClusterInfo) {
        let mut clusters = self.clusters.write();
        match clusters.get_mut(&info.cluster_id) {
            Some(existing) if existing.last_heartbeat >= info.last_heartbeat => {}
            _ => {
                clusters.insert(info.cluster_id.clone(), info);
            }
        }
    }

    pub fn mark_degraded(&self, cluster_id: &str) {
        if let Some(cluster) = self.clusters.write().get_mut(cluster_id) {
            cluster.status = ClusterStatus::Degraded;
        }
    }

    pub fn mark_offline(&self, cluster_id: &str) {
        if let Some(cluster) = self.clusters.write().get_mut(cluster_id) {
            cluster.status = ClusterStatus::Offline;
        }
    }

    /// Health-checker sweep (spec.md §4.5): clusters whose
    /// `now - lastHeartbeat > staleness` go offline.
    pub fn sweep_stale(&self, staleness: Duration) {
        let now = Utc::now();
        let threshold = chrono::Duration::from_std(staleness).unwrap_or(chrono::Duration::seconds(30));
        let mut clusters = self.clusters.write();
        for cluster in clusters.values_mut() {
            if cluster.is_stale(now, threshold) && cluster.status != ClusterStatus::Offline {
                cluster.status = ClusterStatus::Offline;
            }
        }
    }

    pub fn register_service(&self, instance: ServiceInstance) {
        let mut services = self.services.write();
        let entries = services.entry(instance.service_name.clone()).or_default();
        entries.retain(|i| i.instance_id != instance.instance_id);
        entries.push(instance);
    }

    pub fn deregister_service(&self, service_name: &str, instance_id: &str) {
        if let Some(entries) = self.services.write().get_mut(service_name) {
            entries.retain(|i| i.instance_id != instance_id);
        }
    }

    pub fn service_instances(&self, service_name: &str) -> Vec<ServiceInstance> {
        self.services.read().get(service_name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(id: &str) -> ClusterInfo {
        ClusterInfo::local(id, id, "us-east-1", format!("http://{id}"))
    }

    #[test]
    fn new_registers_local_cluster_as_healthy() {
        let m = Membership::new(cluster("c1"));
        assert_eq!(m.get_cluster("c1").unwrap().status, ClusterStatus::Healthy);
    }

    #[test]
    fn sweep_stale_marks_old_heartbeats_offline() {
        let m = Membership::new(cluster("c1"));
        let mut stale = cluster("c2");
        stale.last_heartbeat = Utc::now() - chrono::Duration::seconds(60);
        m.register_cluster(stale);

        m.sweep_stale(Duration::from_secs(30));

        assert_eq!(m.get_cluster("c1").unwrap().status, ClusterStatus::Healthy);
        assert_eq!(m.get_cluster("c2").unwrap().status, ClusterStatus::Offline);
    }

    #[test]
    fn record_heartbeat_ignores_stale_replays() {
        let m = Membership::new(cluster("c1"));
        let mut newer = cluster("c1");
        newer.status = ClusterStatus::Degraded;
        m.record_heartbeat(newer.clone());
        assert_eq!(m.get_cluster("c1").unwrap().status, ClusterStatus::Degraded);

        let mut older = cluster("c1");
        older.last_heartbeat = newer.last_heartbeat - chrono::Duration::seconds(5);
        older.status = ClusterStatus::Healthy;
        m.record_heartbeat(older);
        assert_eq!(m.get_cluster("c1").unwrap().status, ClusterStatus::Degraded);
    }

    #[test]
    fn service_registry_round_trips() {
        let m = Membership::new(cluster("c1"));
        m.register_service(ServiceInstance {
            service_name: "matching".into(),
            instance_id: "i1".into(),
            endpoint: "http://i1".into(),
        });
        assert_eq!(m.service_instances("matching").len(), 1);
        m.deregister_service("matching", "i1");
        assert!(m.service_instances("matching").is_empty());
    }
}
