//! Runtime configuration for the Worker binary, loaded from the
//! environment (SPEC_FULL.md §1 "Configuration").

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub history_grpc_addr: String,
    pub matching_grpc_addr: String,
    /// Task queues this worker polls, e.g. `workflows-default,workflows-high`.
    pub task_queues: Vec<String>,
    pub identity: String,
    /// Upper bound on concurrently-executing tasks across all queues.
    pub max_concurrency: usize,
    /// `PollTask` long-poll budget (spec.md §4.4 default 60s).
    pub poll_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0} must be set to at least one task queue")]
    NoTaskQueues(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let task_queues: Vec<String> = env::var("WORKER_TASK_QUEUES")
            .unwrap_or_else(|_| "workflows-default".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if task_queues.is_empty() {
            return Err(ConfigError::NoTaskQueues("WORKER_TASK_QUEUES"));
        }

        let identity = env::var("WORKER_IDENTITY").unwrap_or_else(|_| {
            format!("worker-{}-{}", hostname(), std::process::id())
        });

        Ok(Self {
            history_grpc_addr: env::var("HISTORY_GRPC_ADDR").unwrap_or_else(|_| "http://127.0.0.1:7233".into()),
            matching_grpc_addr: env::var("MATCHING_GRPC_ADDR").unwrap_or_else(|_| "http://127.0.0.1:7235".into()),
            task_queues,
            identity,
            max_concurrency: parse_usize("WORKER_MAX_CONCURRENCY", 20)?,
            poll_timeout: Duration::from_millis(parse_usize("WORKER_POLL_TIMEOUT_MILLIS", 60_000)? as u64),
        })
    }
}

fn hostname() -> String {
    env::var("HOSTNAME").unwrap_or_else(|_| "localhost".into())
}

fn parse_usize(key: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_usize_falls_back_to_default_when_unset() {
        assert_eq!(parse_usize("LINKFLOW_WORKER_TEST_UNSET_KEY", 7).unwrap(), 7);
    }
}
