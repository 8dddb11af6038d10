//! Task store contract (spec.md §4.2 "Task store — two implementations,
//! one interface"): `AddTask`, `PollTask(timeout)`, `AckTask`, `Len`.

mod memory;
mod redis_store;

pub use memory::InMemoryTaskStore;
pub use redis_store::RedisTaskStore;

use std::time::Duration;

use async_trait::async_trait;
use linkflow_types::{Result, Task};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Returns `false` if a task with this ID is already present
    /// (duplicate add, the caller treats this as `TaskExists`).
    async fn add_task(&self, task: Task) -> Result<bool>;

    /// Blocks up to `timeout` so long-poll callers can be cancelled
    /// cooperatively; returns `None` on timeout with nothing available.
    async fn poll_task(&self, timeout: Duration) -> Result<Option<Task>>;

    /// Removes a task by ID, from the in-flight/processing set. Returns
    /// whether a task was actually removed.
    async fn ack_task(&self, task_id: &str) -> Result<bool>;

    async fn len(&self) -> Result<usize>;
}
