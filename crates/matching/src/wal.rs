//! Write-ahead log for a task queue (spec.md §4.2 "Write-ahead log
//! (WAL)"): an append-only JSON-lines file, fsynced on every write,
//! replayed on startup to recover the surviving task set before the
//! queue accepts new traffic.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use linkflow_types::{EngineError, Result, Task};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalRecord {
    Add { task: Task },
    Complete { task_id: String },
}

pub struct Wal {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl Wal {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EngineError::Store(format!("opening WAL at {}: {e}", path.display())))?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    /// Replays the log into the set of tasks that were added but never
    /// completed — the set the queue re-enqueues before accepting new
    /// traffic.
    pub fn replay(path: impl AsRef<Path>) -> Result<Vec<Task>> {
        let path = path.as_ref();
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EngineError::Store(format!("reading WAL at {}: {e}", path.display()))),
        };

        let mut surviving: HashMap<String, Task> = HashMap::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| EngineError::Store(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: WalRecord = serde_json::from_str(&line).map_err(|e| EngineError::Store(e.to_string()))?;
            match record {
                WalRecord::Add { task } => {
                    surviving.insert(task.id.clone(), task);
                }
                WalRecord::Complete { task_id } => {
                    surviving.remove(&task_id);
                }
            }
        }
        Ok(surviving.into_values().collect())
    }

    pub async fn record_add(&self, task: &Task) -> Result<()> {
        self.append(&WalRecord::Add { task: task.clone() }).await
    }

    pub async fn record_complete(&self, task_id: &str) -> Result<()> {
        self.append(&WalRecord::Complete { task_id: task_id.to_string() }).await
    }

    async fn append(&self, record: &WalRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).map_err(|e| EngineError::Store(e.to_string()))?;
        line.push('\n');
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(|e| EngineError::Store(format!("writing WAL: {e}")))
    }

    /// Compacts the log by rewriting only the surviving `add` records,
    /// dropping every completed task's history.
    pub async fn compact(&self) -> Result<()> {
        let surviving = Self::replay(&self.path)?;
        let tmp_path = self.path.with_extension("wal.tmp");

        let mut tmp = std::fs::File::create(&tmp_path)
            .map_err(|e| EngineError::Store(format!("creating WAL compaction file: {e}")))?;
        for task in &surviving {
            let mut line = serde_json::to_string(&WalRecord::Add { task: task.clone() })
                .map_err(|e| EngineError::Store(e.to_string()))?;
            line.push('\n');
            tmp.write_all(line.as_bytes())
                .map_err(|e| EngineError::Store(format!("writing WAL compaction file: {e}")))?;
        }
        tmp.sync_all().map_err(|e| EngineError::Store(e.to_string()))?;

        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| EngineError::Store(format!("replacing WAL with compacted file: {e}")))?;

        let mut file = self.file.lock().await;
        *file = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| EngineError::Store(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkflow_types::{ExecutionKey, TaskType};

    fn task(id: &str) -> Task {
        let key = ExecutionKey::new("ns", id, "run1");
        Task::new(key, TaskType::ActivityTask, 1, serde_json::json!({}))
    }

    #[tokio::test]
    async fn replay_returns_adds_without_matching_completes() {
        let dir = std::env::temp_dir().join(format!("linkflow-wal-test-{}", uuid::Uuid::now_v7()));
        let wal = Wal::open(&dir).unwrap();

        let a = task("a");
        let b = task("b");
        wal.record_add(&a).await.unwrap();
        wal.record_add(&b).await.unwrap();
        wal.record_complete(&a.id).await.unwrap();

        let surviving = Wal::replay(&dir).unwrap();
        assert_eq!(surviving.len(), 1);
        assert_eq!(surviving[0].id, b.id);

        std::fs::remove_file(&dir).ok();
    }

    #[tokio::test]
    async fn compact_rewrites_only_surviving_adds() {
        let dir = std::env::temp_dir().join(format!("linkflow-wal-compact-{}", uuid::Uuid::now_v7()));
        let wal = Wal::open(&dir).unwrap();

        let a = task("a");
        let b = task("b");
        wal.record_add(&a).await.unwrap();
        wal.record_add(&b).await.unwrap();
        wal.record_complete(&a.id).await.unwrap();
        wal.compact().await.unwrap();

        let surviving = Wal::replay(&dir).unwrap();
        assert_eq!(surviving.len(), 1);
        assert_eq!(surviving[0].id, b.id);

        std::fs::remove_file(&dir).ok();
    }
}
