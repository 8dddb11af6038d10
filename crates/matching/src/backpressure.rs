//! Per-queue depth-based backpressure (spec.md §4.2 "Backpressure").
//!
//! Unlike the worker pool's load-ratio watermark
//! (`linkflow_history`-adjacent concept, teacher's
//! `worker::BackpressureState`), a task queue's pressure is driven by
//! absolute depth against soft/hard limits, not a concurrency ratio.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub const DEFAULT_SOFT_LIMIT: u64 = 10_000;
pub const DEFAULT_HARD_LIMIT: u64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureLevel {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackpressureConfig {
    pub soft_limit: u64,
    pub hard_limit: u64,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            soft_limit: DEFAULT_SOFT_LIMIT,
            hard_limit: DEFAULT_HARD_LIMIT,
        }
    }
}

/// Tracks the current pressure level for one queue and counts
/// rejections issued while at `Critical`.
pub struct BackpressureTracker {
    config: BackpressureConfig,
    level: AtomicU64,
    rejections: AtomicU64,
}

impl BackpressureTracker {
    pub fn new(config: BackpressureConfig) -> Self {
        Self {
            config,
            level: AtomicU64::new(level_to_code(PressureLevel::Normal)),
            rejections: AtomicU64::new(0),
        }
    }

    /// `Check(depth)`. Logs (via `tracing`) on every level transition.
    pub fn check(&self, depth: u64, queue: &str) -> PressureLevel {
        let level = if depth >= self.config.hard_limit {
            PressureLevel::Critical
        } else if depth >= self.config.soft_limit {
            PressureLevel::Warning
        } else {
            PressureLevel::Normal
        };

        let code = level_to_code(level);
        let previous = self.level.swap(code, Ordering::Relaxed);
        if previous != code {
            tracing::warn!(queue, depth, ?level, "queue backpressure level changed");
        }
        level
    }

    /// `ShouldReject`. Only meaningful after `check` has been called
    /// for the current depth.
    pub fn should_reject(&self) -> bool {
        let rejecting = self.level.load(Ordering::Relaxed) == level_to_code(PressureLevel::Critical);
        if rejecting {
            self.rejections.fetch_add(1, Ordering::Relaxed);
        }
        rejecting
    }

    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::Relaxed)
    }
}

fn level_to_code(level: PressureLevel) -> u64 {
    match level {
        PressureLevel::Normal => 0,
        PressureLevel::Warning => 1,
        PressureLevel::Critical => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_below_soft_limit() {
        let tracker = BackpressureTracker::new(BackpressureConfig::default());
        assert_eq!(tracker.check(100, "q"), PressureLevel::Normal);
        assert!(!tracker.should_reject());
    }

    #[test]
    fn critical_at_hard_limit_rejects_and_counts() {
        let config = BackpressureConfig { soft_limit: 10, hard_limit: 20 };
        let tracker = BackpressureTracker::new(config);
        assert_eq!(tracker.check(25, "q"), PressureLevel::Critical);
        assert!(tracker.should_reject());
        assert!(tracker.should_reject());
        assert_eq!(tracker.rejections(), 2);
    }

    #[test]
    fn warning_between_watermarks_does_not_reject() {
        let config = BackpressureConfig { soft_limit: 10, hard_limit: 20 };
        let tracker = BackpressureTracker::new(config);
        assert_eq!(tracker.check(15, "q"), PressureLevel::Warning);
        assert!(!tracker.should_reject());
    }
}
