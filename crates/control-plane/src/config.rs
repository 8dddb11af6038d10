//! Runtime configuration for the Control Plane binary, loaded from the
//! environment (SPEC_FULL.md §1 "Configuration").

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster_id: String,
    pub cluster_name: String,
    pub cluster_region: String,
    pub cluster_endpoint: String,
    pub grpc_addr: String,
    pub http_addr: String,
    /// Other clusters' `ControlService` endpoints to heartbeat against.
    pub peer_endpoints: Vec<String>,
    /// Cross-cluster heartbeat tick (spec.md §4.5 default 30s).
    pub heartbeat_interval: Duration,
    /// Local health-checker tick marking stale clusters offline (default 10s).
    pub health_check_interval: Duration,
    /// `now - lastHeartbeat` threshold past which a cluster is offline (default 30s).
    pub staleness: Duration,
    pub max_heartbeat_retries: u32,
    /// Per-peer-sync deadline (spec.md §5 `heartbeatTimeout`, default 10s).
    pub heartbeat_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let peer_endpoints = match env::var("CONTROL_PEER_ENDPOINTS") {
            Ok(raw) if !raw.trim().is_empty() => raw.split(',').map(|s| s.trim().to_string()).collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            cluster_id: env::var("CLUSTER_ID").unwrap_or_else(|_| "local".into()),
            cluster_name: env::var("CLUSTER_NAME").unwrap_or_else(|_| "local".into()),
            cluster_region: env::var("CLUSTER_REGION").unwrap_or_else(|_| "local".into()),
            cluster_endpoint: env::var("CLUSTER_ENDPOINT").unwrap_or_else(|_| "http://127.0.0.1:7236".into()),
            grpc_addr: env::var("CONTROL_GRPC_ADDR").unwrap_or_else(|_| "0.0.0.0:7236".into()),
            http_addr: env::var("CONTROL_HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8090".into()),
            peer_endpoints,
            heartbeat_interval: Duration::from_millis(parse_u64("CONTROL_HEARTBEAT_INTERVAL_MILLIS", 30_000)?),
            health_check_interval: Duration::from_millis(parse_u64("CONTROL_HEALTH_CHECK_INTERVAL_MILLIS", 10_000)?),
            staleness: Duration::from_millis(parse_u64("CONTROL_STALENESS_MILLIS", 30_000)?),
            max_heartbeat_retries: parse_u64("CONTROL_MAX_HEARTBEAT_RETRIES", 3)? as u32,
            heartbeat_timeout: Duration::from_millis(parse_u64("CONTROL_HEARTBEAT_TIMEOUT_MILLIS", 10_000)?),
        })
    }
}

fn parse_u64(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_u64_falls_back_to_default_when_unset() {
        assert_eq!(parse_u64("LINKFLOW_CONTROL_TEST_UNSET_KEY", 7).unwrap(), 7);
    }
}
