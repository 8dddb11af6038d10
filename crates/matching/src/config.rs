//! Runtime configuration for the Matching service binary, loaded from
//! the environment (SPEC_FULL.md §1 "Configuration").

use std::env;

use crate::partition::DEFAULT_PARTITION_COUNT;

#[derive(Debug, Clone)]
pub struct Config {
    pub namespace: String,
    pub grpc_addr: String,
    pub partition_count: u32,
    /// Partitions this process owns. Defaults to every partition,
    /// matching a single-process deployment.
    pub owned_partitions: Vec<u32>,
    /// Directory for per-queue write-ahead logs. Unset disables the
    /// WAL (development only; a process restart then loses in-flight
    /// queue contents for the in-memory store).
    pub wal_dir: Option<String>,
    pub redis_url: Option<String>,
    pub reaper_interval_millis: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let partition_count = parse_u32("PARTITION_COUNT", DEFAULT_PARTITION_COUNT)?;
        let owned_partitions = match env::var("OWNED_PARTITIONS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| {
                    s.trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue { key: "OWNED_PARTITIONS", value: raw.clone() })
                })
                .collect::<Result<Vec<u32>, _>>()?,
            Err(_) => (0..partition_count).collect(),
        };

        Ok(Self {
            namespace: env::var("LINKFLOW_NAMESPACE").unwrap_or_else(|_| "default".into()),
            grpc_addr: env::var("MATCHING_GRPC_ADDR").unwrap_or_else(|_| "0.0.0.0:7235".into()),
            partition_count,
            owned_partitions,
            wal_dir: env::var("MATCHING_WAL_DIR").ok(),
            redis_url: env::var("REDIS_URL").ok(),
            reaper_interval_millis: parse_u32("LEASE_REAPER_INTERVAL_MILLIS", 5_000)? as u64,
        })
    }
}

fn parse_u32(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_u32_falls_back_to_default_when_unset() {
        assert_eq!(parse_u32("LINKFLOW_MATCHING_TEST_UNSET_KEY", 4).unwrap(), 4);
    }
}
