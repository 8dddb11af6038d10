//! Consistent-hash routing of a task queue name to one of a fixed pool
//! of partitions (spec.md §4.2 "Partitioning").
//!
//! A real deployment runs one Matching process per partition (or a
//! shard range within a process, mirroring `linkflow_history::shard`);
//! this ring only decides which partition owns a queue, not who runs
//! it. `replicas` virtual nodes per partition smooth the distribution
//! the same way the teacher's shard router smooths execution keys
//! across shards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PARTITION_COUNT: u32 = 4;
const DEFAULT_REPLICAS: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionRing {
    partition_count: u32,
    replicas: u32,
    ring: BTreeMap<u64, u32>,
}

impl PartitionRing {
    pub fn new(partition_count: u32, replicas: u32) -> Self {
        let mut ring = BTreeMap::new();
        for partition in 0..partition_count {
            for replica in 0..replicas {
                let point = hash_str(&format!("{partition}-{replica}"));
                ring.insert(point, partition);
            }
        }
        Self {
            partition_count,
            replicas,
            ring,
        }
    }

    pub fn partition_count(&self) -> u32 {
        self.partition_count
    }

    /// `partitionForTaskQueue(name)`: walks the ring clockwise from the
    /// queue name's hash to the first vacant point.
    pub fn partition_for_task_queue(&self, queue: &str) -> u32 {
        let point = hash_str(queue);
        match self.ring.range(point..).next() {
            Some((_, partition)) => *partition,
            None => *self.ring.values().next().expect("ring is never empty"),
        }
    }
}

impl Default for PartitionRing {
    fn default() -> Self {
        Self::new(DEFAULT_PARTITION_COUNT, DEFAULT_REPLICAS)
    }
}

fn hash_str(value: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_queue_always_maps_to_same_partition() {
        let ring = PartitionRing::default();
        let a = ring.partition_for_task_queue("orders-default");
        let b = ring.partition_for_task_queue("orders-default");
        assert_eq!(a, b);
        assert!(a < ring.partition_count());
    }

    #[test]
    fn distributes_across_all_partitions() {
        let ring = PartitionRing::new(4, 100);
        let mut seen = std::collections::HashSet::new();
        for i in 0..200 {
            seen.insert(ring.partition_for_task_queue(&format!("queue-{i}")));
        }
        assert_eq!(seen.len(), 4);
    }
}
