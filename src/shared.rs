//! Shared registry handle
//!
//! Wraps a registry in a reader-writer lock so several threads can use it.
//! Every call runs as one critical section: reads share the lock, mutations
//! hold it exclusively until they have committed, so no caller can observe a
//! half-linked list.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::RegistryConfig;
use crate::error::Result;
use crate::interval::{IntervalRegistry, Node, NodeId, RegistrySnapshot, RegistryStats};
use crate::storage::{MemoryStore, NodeStore};

/// Cloneable, thread-safe handle to an [`IntervalRegistry`]
#[derive(Debug)]
pub struct SharedRegistry<S = MemoryStore> {
    inner: Arc<RwLock<IntervalRegistry<S>>>,
}

impl<S> Clone for SharedRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedRegistry<MemoryStore> {
    /// Create a handle to an empty in-memory registry
    pub fn new(config: RegistryConfig) -> Self {
        Self::from_registry(IntervalRegistry::with_config(config))
    }
}

impl Default for SharedRegistry<MemoryStore> {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl<S: NodeStore> SharedRegistry<S> {
    /// Share an existing registry
    pub fn from_registry(registry: IntervalRegistry<S>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// [`IntervalRegistry::get`] under a read lock
    pub fn get(&self, id: NodeId) -> Result<(u64, u64)> {
        self.inner.read().get(id)
    }

    /// [`IntervalRegistry::next`] under a read lock
    pub fn next(&self, id: NodeId) -> Result<NodeId> {
        self.inner.read().next(id)
    }

    /// [`IntervalRegistry::prev`] under a read lock
    pub fn prev(&self, id: NodeId) -> Result<NodeId> {
        self.inner.read().prev(id)
    }

    /// [`IntervalRegistry::first_index`] under a read lock
    pub fn first_index(&self) -> NodeId {
        self.inner.read().first_index()
    }

    /// [`IntervalRegistry::max_index`] under a read lock
    pub fn max_index(&self) -> NodeId {
        self.inner.read().max_index()
    }

    /// [`IntervalRegistry::last_inserted`] under a read lock
    pub fn last_inserted(&self) -> NodeId {
        self.inner.read().last_inserted()
    }

    /// [`IntervalRegistry::find`] under a read lock
    pub fn find(&self, point: u64) -> Option<NodeId> {
        self.inner.read().find(point)
    }

    /// [`IntervalRegistry::len`] under a read lock
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// [`IntervalRegistry::is_empty`] under a read lock
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// [`IntervalRegistry::stats`] under a read lock
    pub fn stats(&self) -> RegistryStats {
        self.inner.read().stats()
    }

    /// [`IntervalRegistry::snapshot`] under a read lock
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.inner.read().snapshot()
    }

    /// Copy of every node in list order, taken under one read lock
    pub fn nodes(&self) -> Vec<Node> {
        self.inner.read().iter().collect()
    }

    /// [`IntervalRegistry::validate`] under a read lock
    pub fn validate(&self) -> Result<()> {
        self.inner.read().validate()
    }

    /// [`IntervalRegistry::insert`] under the write lock
    pub fn insert(&self, prev: NodeId, next: NodeId, begin: u64, end: u64) -> Result<NodeId> {
        self.inner.write().insert(prev, next, begin, end)
    }

    /// [`IntervalRegistry::insert_sorted`] under the write lock
    pub fn insert_sorted(&self, begin: u64, end: u64) -> Result<NodeId> {
        self.inner.write().insert_sorted(begin, end)
    }

    /// [`IntervalRegistry::remove`] under the write lock
    pub fn remove(&self, id: NodeId, begin: u64, end: u64) -> Result<Option<NodeId>> {
        self.inner.write().remove(id, begin, end)
    }

    /// Run `f` with exclusive access, for multi-step updates that must not interleave
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut IntervalRegistry<S>) -> R) -> R {
        f(&mut self.inner.write())
    }
}
