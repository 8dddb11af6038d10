//! Tenant/workspace container.

use std::collections::HashSet;

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ArchivalConfig {
    pub enabled: bool,
    pub uri: Option<String>,
}

impl Default for ArchivalConfig {
    fn default() -> Self {
        Self { enabled: false, uri: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Namespace {
    pub id: String,
    pub name: String,
    #[serde(with = "retention_days")]
    pub retention: ChronoDuration,
    pub allowed_clusters: HashSet<String>,
    pub default_cluster: String,
    pub search_attributes: std::collections::HashMap<String, String>,
    pub archival: ArchivalConfig,
}

impl Namespace {
    pub fn new(id: impl Into<String>, name: impl Into<String>, default_cluster: impl Into<String>) -> Self {
        let default_cluster = default_cluster.into();
        let mut allowed_clusters = HashSet::new();
        allowed_clusters.insert(default_cluster.clone());
        Self {
            id: id.into(),
            name: name.into(),
            retention: ChronoDuration::days(30),
            allowed_clusters,
            default_cluster,
            search_attributes: std::collections::HashMap::new(),
            archival: ArchivalConfig::default(),
        }
    }
}

mod retention_days {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        d.num_days().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let days = i64::deserialize(deserializer)?;
        Ok(Duration::days(days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_namespace_allows_its_own_default_cluster() {
        let ns = Namespace::new("ns1", "Production", "us-east");
        assert!(ns.allowed_clusters.contains("us-east"));
        assert_eq!(ns.default_cluster, "us-east");
    }
}
