//! Throughput of many concurrent pollers draining one queue, modeling
//! a worker fleet competing for tasks under lease semantics.
//! Generalizes the teacher's `concurrent_workers` load test (which
//! rendered its own HTML/Gatling-style report) to a plain criterion
//! benchmark over this crate's queue.

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

use linkflow_matching::dlq::DeadLetterQueue;
use linkflow_matching::queue::{TaskQueue, TaskQueueConfig};
use linkflow_matching::store::InMemoryTaskStore;
use linkflow_types::{ExecutionKey, Task, TaskType};

fn task(i: u64) -> Task {
    let key = ExecutionKey::new("bench-ns", format!("wf-{i}"), "run1");
    Task::new(key, TaskType::ActivityTask, 1, serde_json::json!({}))
}

fn bench_concurrent_workers(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("concurrent_workers");

    for &worker_count in &[1usize, 8, 32] {
        group.bench_with_input(
            BenchmarkId::from_parameter(worker_count),
            &worker_count,
            |b, &worker_count| {
                b.to_async(&rt).iter(|| async move {
                    let queue = Arc::new(TaskQueue::new(
                        "bench-queue",
                        InMemoryTaskStore::new(),
                        Arc::new(DeadLetterQueue::default()),
                        TaskQueueConfig { rate_per_sec: 1_000_000.0, burst: 1_000_000, ..TaskQueueConfig::default() },
                    ));

                    let task_count = worker_count * 10;
                    for i in 0..task_count as u64 {
                        queue.add_task(task(i)).await.unwrap();
                    }

                    let mut handles = Vec::with_capacity(worker_count);
                    for w in 0..worker_count {
                        let queue = queue.clone();
                        handles.push(tokio::spawn(async move {
                            let identity = format!("worker-{w}");
                            while let Some((_, token)) =
                                queue.poll(&identity, Duration::from_millis(20)).await.unwrap()
                            {
                                queue.complete_task(&token).await.unwrap();
                            }
                        }));
                    }
                    for handle in handles {
                        handle.await.unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_concurrent_workers);
criterion_main!(benches);
