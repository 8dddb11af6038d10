//! Shard ownership (spec.md §4.1 "Shard controller").
//!
//! A static map `shard_id -> Shard` exists so the writer path for a
//! single execution never needs a global lock: once a process owns a
//! shard, every `RecordEvent` for a key that hashes into it is
//! serialized by that shard's state alone. Ownership itself is static
//! for this workspace (single-process deployment, or equal static
//! partitioning across processes) — leased ownership migration is
//! named in spec.md as a future design, not implemented here.

use std::collections::HashSet;

use linkflow_types::{shard_id, EngineError, ExecutionKey, Result, DEFAULT_SHARD_COUNT};

#[derive(Debug, Clone)]
pub struct Shard {
    pub id: u32,
}

/// Owns the subset of shards this process is responsible for.
pub struct ShardController {
    shard_count: u32,
    owned: HashSet<u32>,
}

impl ShardController {
    /// A controller owning every shard — the default for a
    /// single-process deployment.
    pub fn owning_all(shard_count: u32) -> Self {
        Self {
            shard_count,
            owned: (0..shard_count).collect(),
        }
    }

    pub fn owning(shard_count: u32, owned: impl IntoIterator<Item = u32>) -> Self {
        Self {
            shard_count,
            owned: owned.into_iter().collect(),
        }
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// Returns the owning shard for `key`, or `ShardNotOwned` if this
    /// process doesn't hold it (the caller should redirect elsewhere).
    pub fn shard_for(&self, key: &ExecutionKey) -> Result<Shard> {
        let id = shard_id(key, self.shard_count);
        if self.owned.contains(&id) {
            Ok(Shard { id })
        } else {
            Err(EngineError::ShardNotOwned(id))
        }
    }
}

impl Default for ShardController {
    fn default() -> Self {
        Self::owning_all(DEFAULT_SHARD_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owning_all_accepts_every_key() {
        let controller = ShardController::default();
        let key = ExecutionKey::new("ns", "wf", "run1");
        assert!(controller.shard_for(&key).is_ok());
    }

    #[test]
    fn unowned_shard_is_rejected() {
        let controller = ShardController::owning(4, [0, 1]);
        // Find a key that hashes to shard 2 or 3.
        for i in 0.. {
            let key = ExecutionKey::new("ns", format!("wf-{i}"), "run1");
            let id = linkflow_types::shard_id(&key, 4);
            if id == 2 || id == 3 {
                assert!(matches!(
                    controller.shard_for(&key),
                    Err(EngineError::ShardNotOwned(_))
                ));
                break;
            }
        }
    }
}
