//! Runtime configuration for the Frontend binary, loaded from the
//! environment (SPEC_FULL.md §1 "Configuration").

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub history_grpc_addr: String,
    pub http_addr: String,
    /// Number of `linkflow:jobs:partition:{n}` streams (spec.md §6).
    pub partition_count: u32,
    /// Partitions this process consumes. Defaults to every partition,
    /// matching a single-process deployment.
    pub owned_partitions: Vec<u32>,
    pub consumer_group: String,
    /// Pending-entry idle threshold before another consumer may claim
    /// it (spec.md §4.3 default 30s).
    pub claim_idle: Duration,
    /// Blocking read timeout per `XREADGROUP` call (spec.md §4.3 "up to 5s").
    pub read_block: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Shared secret for HMAC-signing outbound callbacks (spec.md §6).
    pub callback_signing_secret: String,
    pub callback_ttl: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

const DEFAULT_PARTITION_COUNT: u32 = 16;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let partition_count = parse_u32("STREAM_PARTITION_COUNT", DEFAULT_PARTITION_COUNT)?;
        let owned_partitions = match env::var("FRONTEND_OWNED_PARTITIONS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| {
                    s.trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue { key: "FRONTEND_OWNED_PARTITIONS", value: raw.clone() })
                })
                .collect::<Result<Vec<u32>, _>>()?,
            Err(_) => (0..partition_count).collect(),
        };

        Ok(Self {
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            history_grpc_addr: env::var("HISTORY_GRPC_ADDR").unwrap_or_else(|_| "http://127.0.0.1:7233".into()),
            http_addr: env::var("FRONTEND_HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            partition_count,
            owned_partitions,
            consumer_group: env::var("FRONTEND_CONSUMER_GROUP").unwrap_or_else(|_| "engine-group".into()),
            claim_idle: Duration::from_millis(parse_u32("FRONTEND_CLAIM_IDLE_MILLIS", 30_000)? as u64),
            read_block: Duration::from_millis(parse_u32("FRONTEND_READ_BLOCK_MILLIS", 5_000)? as u64),
            max_retries: parse_u32("FRONTEND_MAX_RETRIES", 3)?,
            retry_base_delay: Duration::from_millis(parse_u32("FRONTEND_RETRY_BASE_DELAY_MILLIS", 1_000)? as u64),
            retry_max_delay: Duration::from_millis(parse_u32("FRONTEND_RETRY_MAX_DELAY_MILLIS", 30_000)? as u64),
            callback_signing_secret: env::var("CALLBACK_SIGNING_SECRET").unwrap_or_else(|_| "dev-secret".into()),
            callback_ttl: Duration::from_millis(parse_u32("CALLBACK_TTL_MILLIS", 300_000)? as u64),
        })
    }

    /// Stream key for partition `n` (spec.md §6 `linkflow:jobs:partition:{0..15}`).
    pub fn partition_stream(&self, n: u32) -> String {
        format!("linkflow:jobs:partition:{n}")
    }

    /// The shared DLQ stream key (spec.md §6 `linkflow:jobs:dlq`).
    pub fn dlq_stream(&self) -> String {
        "linkflow:jobs:dlq".to_string()
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
        assert_eq!(parse_u32("LINKFLOW_FRONTEND_TEST_UNSET_KEY", 9).unwrap(), 9);
    }
}
