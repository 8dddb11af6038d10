//! End-to-end throughput of the `RecordEvent` path against the
//! in-memory stores: `ExecutionStarted` followed by a `NodeScheduled`/
//! `NodeCompleted` pair, repeated across many concurrently-driven
//! executions. Generalizes the teacher's `workflow_throughput` bench
//! from its bespoke claim-loop scenario to this crate's event-sourced
//! model.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use tokio::runtime::Runtime;

use linkflow_history::engine::HistoryEngine;
use linkflow_history::persistence::{InMemoryEventStore, InMemoryMutableStateStore, InMemoryVisibilityStore};
use linkflow_history::shard::ShardController;
use linkflow_history::task_dispatch::RecordingDispatcher;
use linkflow_types::{EventAttributes, ExecutionKey, TimeoutConfig};

fn build_engine() -> HistoryEngine {
    HistoryEngine::new(
        Arc::new(InMemoryEventStore::new()),
        Arc::new(InMemoryMutableStateStore::new()),
        Arc::new(InMemoryVisibilityStore::new()),
        Arc::new(RecordingDispatcher::new()),
        ShardController::default(),
    )
}

async fn run_workflow(engine: &HistoryEngine, key: ExecutionKey) {
    engine
        .record_event(
            &key,
            EventAttributes::ExecutionStarted {
                workflow_type: "bench_workflow".into(),
                task_queue: "bench-queue".into(),
                input: json!({}),
                timeout_config: TimeoutConfig::default(),
            },
        )
        .await
        .unwrap();

    engine
        .record_event(
            &key,
            EventAttributes::NodeScheduled {
                node_id: "n1".into(),
                node_type: "bench_activity".into(),
                input: json!({}),
                options: Default::default(),
                task_queue: "bench-queue".into(),
                attempt: 1,
            },
        )
        .await
        .unwrap();

    engine
        .record_event(
            &key,
            EventAttributes::NodeCompleted {
                scheduled_event_id: 2,
                result: json!({"ok": true}),
            },
        )
        .await
        .unwrap();
}

fn bench_workflow_throughput(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("workflow_throughput");

    for &concurrency in &[1usize, 10, 50] {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, &concurrency| {
                b.to_async(&rt).iter(|| async {
                    let engine = Arc::new(build_engine());
                    let mut handles = Vec::with_capacity(concurrency);
                    for i in 0..concurrency {
                        let engine = engine.clone();
                        let key = ExecutionKey::new("bench-ns", format!("wf-{i}"), "run1");
                        handles.push(tokio::spawn(async move { run_workflow(&engine, key).await }));
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

criterion_group!(benches, bench_workflow_throughput);
criterion_main!(benches);
