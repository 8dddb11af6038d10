//! Latency of a single enqueue-then-claim round trip against the
//! in-memory task store, across a range of pre-existing queue depths.
//! Generalizes the teacher's task-claim benchmark to this crate's
//! lease/token model.

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

use linkflow_matching::dlq::DeadLetterQueue;
use linkflow_matching::queue::{TaskQueue, TaskQueueConfig};
use linkflow_matching::store::InMemoryTaskStore;
use linkflow_types::{ExecutionKey, Task, TaskType};

fn build_queue() -> TaskQueue {
    TaskQueue::new(
        "bench-queue",
        InMemoryTaskStore::new(),
        Arc::new(DeadLetterQueue::default()),
        TaskQueueConfig::default(),
    )
}

fn task(i: u64) -> Task {
    let key = ExecutionKey::new("bench-ns", format!("wf-{i}"), "run1");
    Task::new(key, TaskType::ActivityTask, 1, serde_json::json!({}))
}

fn bench_task_claiming(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("task_claiming");

    for &backlog in &[0usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(backlog), &backlog, |b, &backlog| {
            b.to_async(&rt).iter(|| async move {
                let queue = build_queue();
                for i in 0..backlog as u64 {
                    queue.add_task(task(i)).await.unwrap();
                }

                let probe = task(backlog as u64);
                queue.add_task(probe.clone()).await.unwrap();
                let (claimed, token) = queue
                    .poll("bench-worker", Duration::from_millis(100))
                    .await
                    .unwrap()
                    .unwrap();
                queue.complete_task(&token).await.unwrap();
                claimed
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_task_claiming);
criterion_main!(benches);
