//! Interval module for the registry
//!
//! This module provides the node types and the [`IntervalRegistry`] that keeps
//! them as an ordered, id-linked list of disjoint intervals.

pub mod node;
pub mod registry;

// Re-export key types
pub use node::{Interval, Node, NodeId};
pub use registry::{
    IntervalRegistry,
    Iter,
    RegistryHeader,
    RegistrySnapshot,
    RegistryStats,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::storage::{MemoryStore, NodeStore, RecordStore};

    /// Drive the same allocator-style workload through any store
    fn carve_and_release<S: NodeStore>(registry: &mut IntervalRegistry<S>) -> Vec<Interval> {
        // One free extent covering the whole space
        let whole = registry.insert(NodeId::NIL, NodeId::NIL, 0, 1 << 20).unwrap();

        // Allocate blocks by carving them out of the free space
        let mut allocated = Vec::new();
        for block in 0..8u64 {
            let begin = block * 4096 + 1024;
            let holder = registry.find(begin).unwrap();
            registry.remove(holder, begin, begin + 512).unwrap();
            allocated.push(Interval::new(begin, begin + 512));
        }
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.first_index(), whole);

        // Release every other block with hints taken from the list
        for block in allocated.iter().step_by(2) {
            let prev = registry.find(block.begin - 1).unwrap();
            let next = registry.next(prev).unwrap();
            registry.insert(prev, next, block.begin, block.end).unwrap();
        }
        assert_eq!(registry.len(), 5);
        registry.validate().unwrap();

        registry.iter().map(|node| node.interval()).collect()
    }

    #[test]
    fn test_allocator_workload_on_both_stores() {
        let mut in_memory = IntervalRegistry::new();
        let mut recorded = IntervalRegistry::with_store(RecordStore::new(), RegistryConfig::default());

        let expected = carve_and_release(&mut in_memory);
        assert_eq!(carve_and_release(&mut recorded), expected);
        assert_eq!(in_memory.header(), recorded.header());

        let covered: u64 = expected.iter().map(Interval::len).sum();
        assert_eq!(covered, (1 << 20) - 4 * 512);
        assert_eq!(in_memory.stats().covered, covered);
    }

    #[test]
    fn test_reopen_from_store() {
        let mut registry = IntervalRegistry::with_store(MemoryStore::new(), RegistryConfig::default());
        registry.insert_sorted(10, 20).unwrap();
        registry.insert_sorted(40, 50).unwrap();
        registry.insert_sorted(20, 30).unwrap();

        let header = registry.header();
        let store = registry.into_store();
        assert_eq!(store.len(), 2);

        let mut reopened = IntervalRegistry::open(store, header, RegistryConfig::default()).unwrap();
        assert_eq!(reopened.get(NodeId::new(1)), Ok((10, 30)));

        // Allocation continues past the old counter
        let id = reopened.insert_sorted(60, 70).unwrap();
        assert_eq!(id, NodeId::new(4));
    }
}
