//! Sticky affinity for queues that pin a workflow's decision tasks to
//! a single worker to benefit from its in-memory state cache (spec.md
//! §4.2 "Sticky affinity").

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Binding {
    identity: String,
    bound_at: Instant,
}

pub struct StickyAffinity {
    lease_timeout: Duration,
    bindings: Mutex<HashMap<String, Binding>>,
}

impl StickyAffinity {
    pub fn new(lease_timeout: Duration) -> Self {
        Self {
            lease_timeout,
            bindings: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if `identity` may take a task for `workflow_id`
    /// right now: either unbound, already bound to `identity`, or the
    /// existing bind has expired (in which case it is rebound here).
    pub fn allow(&self, workflow_id: &str, identity: &str) -> bool {
        let mut bindings = self.bindings.lock();
        match bindings.get(workflow_id) {
            Some(binding) if binding.identity == identity => true,
            Some(binding) if binding.bound_at.elapsed() < self.lease_timeout => false,
            _ => {
                bindings.insert(
                    workflow_id.to_string(),
                    Binding { identity: identity.to_string(), bound_at: Instant::now() },
                );
                true
            }
        }
    }

    pub fn release(&self, workflow_id: &str) {
        self.bindings.lock().remove(workflow_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_poller_binds_and_later_pollers_are_refused() {
        let affinity = StickyAffinity::new(Duration::from_secs(60));
        assert!(affinity.allow("wf1", "worker-a"));
        assert!(affinity.allow("wf1", "worker-a"));
        assert!(!affinity.allow("wf1", "worker-b"));
    }

    #[test]
    fn expired_bind_allows_rebinding_to_a_different_poller() {
        let affinity = StickyAffinity::new(Duration::from_millis(10));
        assert!(affinity.allow("wf1", "worker-a"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(affinity.allow("wf1", "worker-b"));
    }
}
