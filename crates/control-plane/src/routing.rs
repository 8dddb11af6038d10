//! `RouteRequest` (spec.md §4.5): picks a healthy cluster for an
//! execution, preferring the namespace's default cluster, then any
//! healthy member of its `allowedClusters`, then any healthy cluster.

use linkflow_types::{ClusterStatus, EngineError};

use crate::membership::Membership;
use crate::namespaces::NamespaceStore;

pub fn route_request(
    membership: &Membership,
    namespaces: &NamespaceStore,
    namespace_id: &str,
    _workflow_id: &str,
) -> Result<String, EngineError> {
    let namespace = namespaces.get(namespace_id)?;
    let clusters = membership.list_clusters();
    let is_healthy = |id: &str| clusters.iter().any(|c| c.cluster_id == id && c.status == ClusterStatus::Healthy);

    if is_healthy(&namespace.default_cluster) {
        return Ok(namespace.default_cluster);
    }

    if let Some(cluster) = namespace.allowed_clusters.iter().find(|id| is_healthy(id)) {
        return Ok(cluster.clone());
    }

    clusters
        .iter()
        .find(|c| c.status == ClusterStatus::Healthy)
        .map(|c| c.cluster_id.clone())
        .ok_or_else(|| EngineError::NoHealthyCluster(namespace_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkflow_types::{ClusterInfo, Namespace};

    fn cluster(id: &str, status: ClusterStatus) -> ClusterInfo {
        let mut c = ClusterInfo::local(id, id, "us-east-1", format!("http://{id}"));
        c.status = status;
        c
    }

    #[test]
    fn prefers_healthy_default_cluster() {
        let membership = Membership::new(cluster("c1", ClusterStatus::Healthy));
        membership.register_cluster(cluster("c2", ClusterStatus::Healthy));
        let namespaces = NamespaceStore::new();
        namespaces.create(Namespace::new("ns1", "Production", "c2")).unwrap();

        assert_eq!(route_request(&membership, &namespaces, "ns1", "wf1").unwrap(), "c2");
    }

    #[test]
    fn falls_back_to_allowed_cluster_when_default_unhealthy() {
        let membership = Membership::new(cluster("c1", ClusterStatus::Healthy));
        membership.register_cluster(cluster("c2", ClusterStatus::Offline));
        let namespaces = NamespaceStore::new();
        let mut ns = Namespace::new("ns1", "Production", "c2");
        ns.allowed_clusters.insert("c1".to_string());
        namespaces.create(ns).unwrap();

        assert_eq!(route_request(&membership, &namespaces, "ns1", "wf1").unwrap(), "c1");
    }

    #[test]
    fn no_healthy_cluster_is_an_error() {
        let membership = Membership::new(cluster("c1", ClusterStatus::Offline));
        let namespaces = NamespaceStore::new();
        namespaces.create(Namespace::new("ns1", "Production", "c1")).unwrap();

        assert!(matches!(
            route_request(&membership, &namespaces, "ns1", "wf1"),
            Err(EngineError::NoHealthyCluster(_))
        ));
    }
}
