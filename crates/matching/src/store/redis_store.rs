//! Redis-backed task store: a main list plus a processing list. Poll
//! performs an atomic `BLMOVE` from main to processing so a task
//! survives a worker crash between claim and ack (spec.md §4.2
//! "Redis-backed"). Ack removes the task by value from the processing
//! list.

use std::time::Duration;

use async_trait::async_trait;
use linkflow_types::{EngineError, Result, Task};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

pub struct RedisTaskStore {
    conn: ConnectionManager,
    queue: String,
    main_key: String,
    processing_key: String,
    dedupe_key: String,
}

impl RedisTaskStore {
    pub async fn connect(redis_url: &str, queue: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(to_engine_error)?;
        let conn = ConnectionManager::new(client).await.map_err(to_engine_error)?;
        Ok(Self::new(conn, queue))
    }

    pub fn new(conn: ConnectionManager, queue: impl Into<String>) -> Self {
        let queue = queue.into();
        Self {
            conn,
            main_key: format!("linkflow:matching:{queue}:main"),
            processing_key: format!("linkflow:matching:{queue}:processing"),
            dedupe_key: format!("linkflow:matching:{queue}:ids"),
            queue,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }
}

fn to_engine_error(err: redis::RedisError) -> EngineError {
    EngineError::Store(err.to_string())
}

#[async_trait]
impl super::TaskStore for RedisTaskStore {
    async fn add_task(&self, task: Task) -> Result<bool> {
        let mut conn = self.conn.clone();
        let added: bool = conn.sadd(&self.dedupe_key, &task.id).await.map_err(to_engine_error)?;
        if !added {
            return Ok(false);
        }
        let payload = serde_json::to_string(&task).map_err(|e| EngineError::Store(e.to_string()))?;
        let _: () = conn.rpush(&self.main_key, payload).await.map_err(to_engine_error)?;
        Ok(true)
    }

    async fn poll_task(&self, timeout: Duration) -> Result<Option<Task>> {
        let mut conn = self.conn.clone();
        let timeout_secs = timeout.as_secs_f64().max(0.001);
        let moved: Option<String> = redis::cmd("BLMOVE")
            .arg(&self.main_key)
            .arg(&self.processing_key)
            .arg("LEFT")
            .arg("RIGHT")
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await
            .map_err(to_engine_error)?;

        match moved {
            Some(payload) => {
                let task: Task = serde_json::from_str(&payload).map_err(|e| EngineError::Store(e.to_string()))?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    async fn ack_task(&self, task_id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let _: () = conn.srem(&self.dedupe_key, task_id).await.map_err(to_engine_error)?;

        let items: Vec<String> = conn.lrange(&self.processing_key, 0, -1).await.map_err(to_engine_error)?;
        for item in items {
            let matches = serde_json::from_str::<Task>(&item)
                .map(|t| t.id == task_id)
                .unwrap_or(false);
            if matches {
                let removed: i64 = conn
                    .lrem(&self.processing_key, 1, &item)
                    .await
                    .map_err(to_engine_error)?;
                return Ok(removed > 0);
            }
        }
        Ok(false)
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn.llen(&self.main_key).await.map_err(to_engine_error)?;
        Ok(len)
    }
}
