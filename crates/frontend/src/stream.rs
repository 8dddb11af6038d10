//! Inbound work-stream consumer (spec.md §4.3): one consumer task per
//! owned partition, Redis consumer-group semantics, stale-claim
//! reaping, bounded retry, and DLQ routing on exhaustion.

use std::time::Duration;

use linkflow_types::{frontend_retry_delay, EngineError};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::history_client::HistoryClient;
use crate::job::JobPayload;

/// One claimed stream entry: its ID plus the raw `payload` field.
struct StreamEntry {
    id: String,
    payload: String,
}

pub struct StreamConsumer {
    conn: ConnectionManager,
    history: HistoryClient,
    config: Config,
}

impl StreamConsumer {
    pub async fn connect(config: Config, history: HistoryClient) -> Result<Self, EngineError> {
        let client = redis::Client::open(config.redis_url.as_str()).map_err(to_engine_error)?;
        let conn = ConnectionManager::new(client).await.map_err(to_engine_error)?;
        Ok(Self { conn, history, config })
    }

    /// Spawns one consumer loop per owned partition; each creates its
    /// consumer group (idempotently) and runs until `shutdown` fires.
    pub fn spawn_all(&self, shutdown: watch::Receiver<bool>) -> Vec<tokio::task::JoinHandle<()>> {
        self.config
            .owned_partitions
            .iter()
            .map(|&partition| {
                let conn = self.conn.clone();
                let history = self.history.clone();
                let config = self.config.clone();
                let mut shutdown = shutdown.clone();
                let stream_key = config.partition_stream(partition);
                let consumer_name = format!("engine-{}-{}-p{partition}", hostname(), std::process::id());

                tokio::spawn(async move {
                    if let Err(e) = ensure_group(&conn, &stream_key, &config.consumer_group).await {
                        error!(stream_key, error = %e, "failed to create consumer group");
                        return;
                    }
                    info!(stream_key, consumer_name, "frontend stream consumer starting");
                    loop {
                        if *shutdown.borrow() {
                            break;
                        }
                        tokio::select! {
                            _ = run_one_pass(&conn, &history, &config, &stream_key, &consumer_name) => {}
                            _ = shutdown.changed() => break,
                        }
                    }
                    info!(stream_key, "frontend stream consumer stopped");
                })
            })
            .collect()
    }
}

async fn ensure_group(conn: &ConnectionManager, stream_key: &str, group: &str) -> Result<(), EngineError> {
    let mut conn = conn.clone();
    let result: redis::RedisResult<()> = redis::cmd("XGROUP")
        .arg("CREATE")
        .arg(stream_key)
        .arg(group)
        .arg("$")
        .arg("MKSTREAM")
        .query_async(&mut conn)
        .await;
    match result {
        Ok(()) => Ok(()),
        // BUSYGROUP means the group already exists; every other
        // consumer tries this on startup too.
        Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
        Err(e) => Err(to_engine_error(e)),
    }
}

/// One iteration of spec.md §4.3's message-processing pipeline: reclaim
/// stale pending entries first, then read one fresh message.
async fn run_one_pass(
    conn: &ConnectionManager,
    history: &HistoryClient,
    config: &Config,
    stream_key: &str,
    consumer_name: &str,
) {
    match autoclaim(conn, config, stream_key, consumer_name).await {
        Ok(entries) => {
            for entry in entries {
                process_entry(conn, history, config, stream_key, consumer_name, entry).await;
            }
        }
        Err(e) => warn!(stream_key, error = %e, "xautoclaim failed"),
    }

    match read_one(conn, config, stream_key, consumer_name).await {
        Ok(Some(entry)) => process_entry(conn, history, config, stream_key, consumer_name, entry).await,
        Ok(None) => {}
        Err(e) => {
            warn!(stream_key, error = %e, "xreadgroup failed");
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
}

async fn autoclaim(
    conn: &ConnectionManager,
    config: &Config,
    stream_key: &str,
    consumer_name: &str,
) -> Result<Vec<StreamEntry>, EngineError> {
    let mut conn = conn.clone();
    let reply: redis::Value = redis::cmd("XAUTOCLAIM")
        .arg(stream_key)
        .arg(&config.consumer_group)
        .arg(consumer_name)
        .arg(config.claim_idle.as_millis() as u64)
        .arg("0-0")
        .arg("COUNT")
        .arg(10)
        .query_async(&mut conn)
        .await
        .map_err(to_engine_error)?;
    Ok(parse_xautoclaim_entries(reply))
}

async fn read_one(
    conn: &ConnectionManager,
    config: &Config,
    stream_key: &str,
    consumer_name: &str,
) -> Result<Option<StreamEntry>, EngineError> {
    let mut conn = conn.clone();
    let reply: redis::Value = redis::cmd("XREADGROUP")
        .arg("GROUP")
        .arg(&config.consumer_group)
        .arg(consumer_name)
        .arg("COUNT")
        .arg(1)
        .arg("BLOCK")
        .arg(config.read_block.as_millis() as u64)
        .arg("STREAMS")
        .arg(stream_key)
        .arg(">")
        .query_async(&mut conn)
        .await
        .map_err(to_engine_error)?;
    Ok(parse_xreadgroup_entries(reply).into_iter().next())
}

async fn process_entry(
    conn: &ConnectionManager,
    history: &HistoryClient,
    config: &Config,
    stream_key: &str,
    consumer_name: &str,
    entry: StreamEntry,
) {
    let payload: JobPayload = match serde_json::from_str(&entry.payload) {
        Ok(p) => p,
        Err(e) => {
            error!(stream_key, entry_id = %entry.id, error = %e, "malformed JobPayload; routing to DLQ");
            let _ = write_dlq(conn, config, stream_key, &entry, "", "malformed_payload", 0).await;
            let _ = ack(conn, config, stream_key, &entry.id).await;
            return;
        }
    };
    let job_id = payload.job_id.clone();

    let mut attempt = 1;
    loop {
        let request = payload.clone().into_start_request();
        match history.record_event(&request.key, request.attributes).await {
            Ok(_event_id) => {
                let _ = ack(conn, config, stream_key, &entry.id).await;
                return;
            }
            Err(e) if attempt >= config.max_retries => {
                error!(stream_key, job_id, attempt, error = %e, "exhausted retries; routing to DLQ");
                let _ = write_dlq(conn, config, stream_key, &entry, &job_id, &e.to_string(), attempt).await;
                let _ = ack(conn, config, stream_key, &entry.id).await;
                return;
            }
            Err(e) => {
                warn!(stream_key, job_id, attempt, error = %e, "ExecutionStarted failed; retrying");
                let delay = frontend_retry_delay(attempt, config.retry_base_delay, config.retry_max_delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

async fn ack(conn: &ConnectionManager, config: &Config, stream_key: &str, entry_id: &str) -> Result<(), EngineError> {
    let mut conn = conn.clone();
    conn.xack(stream_key, &config.consumer_group, &[entry_id])
        .await
        .map_err(to_engine_error)
}

/// DLQ message body (spec.md §6): `{original_payload, original_stream,
/// original_msg_id, job_id, failure_reason, attempt_count, failed_at}`.
async fn write_dlq(
    conn: &ConnectionManager,
    config: &Config,
    stream_key: &str,
    entry: &StreamEntry,
    job_id: &str,
    failure_reason: &str,
    attempt_count: u32,
) -> Result<(), EngineError> {
    let mut conn = conn.clone();
    let body = serde_json::json!({
        "original_payload": entry.payload,
        "original_stream": stream_key,
        "original_msg_id": entry.id,
        "job_id": job_id,
        "failure_reason": failure_reason,
        "attempt_count": attempt_count,
        "failed_at": chrono::Utc::now(),
    });
    let _: String = conn
        .xadd(config.dlq_stream(), "*", &[("payload", serde_json::to_string(&body).unwrap_or_default())])
        .await
        .map_err(to_engine_error)?;
    Ok(())
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".into())
}

fn to_engine_error(err: redis::RedisError) -> EngineError {
    EngineError::Store(err.to_string())
}

/// Parses the nested reply of `XREADGROUP ... STREAMS key >` into the
/// `payload` field of each entry.
fn parse_xreadgroup_entries(reply: redis::Value) -> Vec<StreamEntry> {
    let redis::Value::Array(streams) = reply else { return Vec::new() };
    let mut out = Vec::new();
    for stream in streams {
        let redis::Value::Array(pair) = stream else { continue };
        let Some(redis::Value::Array(entries)) = pair.into_iter().nth(1) else { continue };
        out.extend(entries.into_iter().filter_map(entry_from_value));
    }
    out
}

/// Parses `XAUTOCLAIM`'s `[cursor, entries, deleted]` reply.
fn parse_xautoclaim_entries(reply: redis::Value) -> Vec<StreamEntry> {
    let redis::Value::Array(parts) = reply else { return Vec::new() };
    let Some(redis::Value::Array(entries)) = parts.into_iter().nth(1) else { return Vec::new() };
    entries.into_iter().filter_map(entry_from_value).collect()
}

fn entry_from_value(value: redis::Value) -> Option<StreamEntry> {
    let redis::Value::Array(fields) = value else { return None };
    let mut iter = fields.into_iter();
    let id = match iter.next()? {
        redis::Value::BulkString(bytes) => String::from_utf8(bytes).ok()?,
        redis::Value::SimpleString(s) => s,
        _ => return None,
    };
    let redis::Value::Array(kv) = iter.next()? else { return None };
    let mut payload = None;
    let mut kv_iter = kv.into_iter();
    while let (Some(key), Some(value)) = (kv_iter.next(), kv_iter.next()) {
        let key = match key {
            redis::Value::BulkString(bytes) => String::from_utf8(bytes).ok()?,
            redis::Value::SimpleString(s) => s,
            _ => continue,
        };
        if key == "payload" {
            payload = match value {
                redis::Value::BulkString(bytes) => String::from_utf8(bytes).ok(),
                redis::Value::SimpleString(s) => Some(s),
                _ => None,
            };
        }
    }
    Some(StreamEntry { id, payload: payload? })
}
