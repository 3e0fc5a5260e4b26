//! Node storage for the interval registry
//!
//! The registry never keeps nodes itself. It loads and stores them through a
//! [`NodeStore`], an id-addressed record store. [`MemoryStore`] keeps nodes in
//! a hash map; [`RecordStore`] keeps them as fixed-size encoded records, the
//! shape a persisted key-value adapter would use.

pub mod record;

use crate::interval::{Node, NodeId};
use ahash::AHashMap;

pub use record::{RecordStore, RecordError, RECORD_SIZE};

/// Id-addressed storage of registry nodes.
///
/// Implementations only map ids to nodes. All ordering and linking rules are
/// enforced by the registry.
pub trait NodeStore {
    /// Load the node stored under `id`, if any
    fn load(&self, id: NodeId) -> Option<Node>;

    /// Insert or overwrite the node under `node.id`
    fn store(&mut self, node: Node);

    /// Remove the node under `id`, returning it
    fn erase(&mut self, id: NodeId) -> Option<Node>;

    /// Number of stored nodes
    fn len(&self) -> usize;

    /// Drop every stored node
    fn clear(&mut self);

    /// True when nothing is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when a node is stored under `id`
    fn contains(&self, id: NodeId) -> bool {
        self.load(id).is_some()
    }
}

/// In-memory node store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    nodes: AHashMap<NodeId, Node>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: AHashMap::with_capacity(capacity),
        }
    }
}

impl NodeStore for MemoryStore {
    fn load(&self, id: NodeId) -> Option<Node> {
        self.nodes.get(&id).copied()
    }

    fn store(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    fn erase(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(&id)
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn clear(&mut self) {
        self.nodes.clear();
    }
}
