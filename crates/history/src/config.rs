//! Runtime configuration for the History service binary, loaded from
//! the environment (SPEC_FULL.md §1 "Configuration").

use std::env;

use linkflow_types::DEFAULT_SHARD_COUNT;

#[derive(Debug, Clone)]
pub struct Config {
    /// `postgres://...` connection string. Required in production; the
    /// in-memory stores are selected only by tests and local dev when
    /// this is unset.
    pub database_url: Option<String>,
    pub grpc_addr: String,
    pub shard_count: u32,
    /// This process's owned shard range, `[shard_range_start,
    /// shard_range_end)`. Defaults to owning every shard, matching a
    /// single-process deployment.
    pub shard_range_start: u32,
    pub shard_range_end: u32,
    pub matching_addr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let shard_count = parse_env("SHARD_COUNT", DEFAULT_SHARD_COUNT)?;
        let shard_range_start = parse_env("SHARD_RANGE_START", 0)?;
        let shard_range_end = parse_env("SHARD_RANGE_END", shard_count)?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            grpc_addr: env::var("HISTORY_GRPC_ADDR").unwrap_or_else(|_| "0.0.0.0:7233".into()),
            shard_count,
            shard_range_start,
            shard_range_end,
            matching_addr: env::var("MATCHING_GRPC_ADDR").unwrap_or_else(|_| "http://127.0.0.1:7235".into()),
        })
    }
}

fn parse_env(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_falls_back_to_default_when_unset() {
        assert_eq!(parse_env("LINKFLOW_HISTORY_TEST_UNSET_KEY", 16).unwrap(), 16);
    }
}
