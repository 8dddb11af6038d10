//! Per-queue metrics: counters, depth/in-flight/poller gauges, and a
//! dispatch-latency ring buffer (spec.md §4.2 "Metrics"). Generalizes
//! the teacher's benchmark-only `LatencyHistogram` into an always-on
//! collaborator the service carries in production, not just in
//! `benches/`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

const RING_BUFFER_CAPACITY: usize = 1000;

#[derive(Default)]
pub struct QueueMetrics {
    pub tasks_added: AtomicU64,
    pub tasks_dispatched: AtomicU64,
    pub tasks_failed: AtomicU64,
    pub tasks_timed_out: AtomicU64,
    pub tasks_dlq: AtomicU64,
    pub tasks_rejected: AtomicU64,

    pub depth: AtomicI64,
    pub in_flight: AtomicI64,
    pub poller_count: AtomicI64,

    dispatch_latency: Mutex<VecDeque<Duration>>,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatch_latency(&self, latency: Duration) {
        let mut samples = self.dispatch_latency.lock();
        if samples.len() >= RING_BUFFER_CAPACITY {
            samples.pop_front();
        }
        samples.push_back(latency);
    }

    pub fn dispatch_latency_percentile(&self, p: f64) -> Duration {
        let samples = self.dispatch_latency.lock();
        if samples.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted: Vec<Duration> = samples.iter().copied().collect();
        sorted.sort();
        let idx = ((sorted.len() as f64 * p) as usize).min(sorted.len() - 1);
        sorted[idx]
    }

    pub fn dispatch_latency_summary(&self) -> LatencySummary {
        LatencySummary {
            p50: self.dispatch_latency_percentile(0.50),
            p95: self.dispatch_latency_percentile(0.95),
            p99: self.dispatch_latency_percentile(0.99),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LatencySummary {
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_over_known_samples() {
        let metrics = QueueMetrics::new();
        for ms in 1..=100u64 {
            metrics.record_dispatch_latency(Duration::from_millis(ms));
        }
        let summary = metrics.dispatch_latency_summary();
        assert!(summary.p50 >= Duration::from_millis(49) && summary.p50 <= Duration::from_millis(51));
        assert!(summary.p99 >= Duration::from_millis(98));
    }

    #[test]
    fn ring_buffer_caps_at_capacity() {
        let metrics = QueueMetrics::new();
        for ms in 0..(RING_BUFFER_CAPACITY as u64 + 50) {
            metrics.record_dispatch_latency(Duration::from_millis(ms));
        }
        assert_eq!(metrics.dispatch_latency.lock().len(), RING_BUFFER_CAPACITY);
    }
}
