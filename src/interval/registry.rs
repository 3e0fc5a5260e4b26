//! Interval registry: an ordered list of disjoint half-open intervals
//!
//! Intervals are kept as a doubly linked list ordered by `begin`, where every
//! link is a [`NodeId`] resolved through a [`NodeStore`]. Adjacent intervals
//! never overlap and never touch: an insert that closes a gap is merged with
//! its neighbours, and a remove that punches a hole splits a node in two.
//!
//! Callers position inserts with a pair of hint ids naming the nodes that
//! will surround the new interval. Hints are validated, never trusted. Every
//! operation checks all of its preconditions before the first write, so a
//! failed call leaves the registry untouched.

use log::{debug, error, trace};

use crate::config::RegistryConfig;
use crate::error::{Corruption, Error, InsertError, RemoveError, Result};
use crate::interval::node::{Node, NodeId};
use crate::storage::{MemoryStore, NodeStore};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// List-level state stored alongside the nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct RegistryHeader {
    /// Node with the lowest `begin`, or `NodeId::NIL` if empty
    pub first_index: NodeId,
    /// Node with the highest `begin`, or `NodeId::NIL` if empty
    pub last_index: NodeId,
    /// Highest id ever allocated
    pub max_index: NodeId,
    /// Node produced by the most recent insert or split
    pub last_inserted: NodeId,
}

/// Header plus every node in list order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct RegistrySnapshot {
    /// List-level state
    pub header: RegistryHeader,
    /// Live nodes from first to last
    pub nodes: Vec<Node>,
}

/// Statistics about the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of live intervals
    pub interval_count: usize,
    /// Highest id ever allocated
    pub max_index: NodeId,
    /// Total number of points covered by all intervals
    pub covered: u64,
}

/// Neighbours loaded while validating an insert
struct InsertPlan {
    /// Id the new node will be stored under
    id: NodeId,
    prev: Option<Node>,
    next: Option<Node>,
    /// Node after `next`, needed when both merges fire
    beyond: Option<Node>,
}

/// Ordered registry of disjoint, non-touching half-open intervals
#[derive(Debug, Clone)]
pub struct IntervalRegistry<S = MemoryStore> {
    store: S,
    header: RegistryHeader,
    config: RegistryConfig,
}

impl IntervalRegistry<MemoryStore> {
    /// Create an empty registry backed by memory
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty in-memory registry with explicit settings
    pub fn with_config(config: RegistryConfig) -> Self {
        let store = MemoryStore::with_capacity(config.initial_capacity);
        Self::with_store(store, config)
    }
}

impl Default for IntervalRegistry<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: NodeStore> IntervalRegistry<S> {
    /// Create an empty registry on top of `store`, discarding anything in it
    pub fn with_store(mut store: S, config: RegistryConfig) -> Self {
        store.clear();
        Self {
            store,
            header: RegistryHeader::default(),
            config,
        }
    }

    /// Reopen a registry whose nodes are already in `store`
    pub fn open(store: S, header: RegistryHeader, config: RegistryConfig) -> Result<Self> {
        let registry = Self {
            store,
            header,
            config,
        };
        registry.validate()?;
        debug!(
            "opened registry with {} intervals, max index {}",
            registry.len(),
            header.max_index
        );
        Ok(registry)
    }

    /// Rebuild a registry from a snapshot, writing its nodes into `store`
    pub fn from_snapshot(
        snapshot: &RegistrySnapshot,
        mut store: S,
        config: RegistryConfig,
    ) -> Result<Self> {
        store.clear();
        for node in &snapshot.nodes {
            store.store(*node);
        }
        Self::open(store, snapshot.header, config)
    }

    /// Copy the header and every node in list order
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            header: self.header,
            nodes: self.iter().collect(),
        }
    }

    /// Current list-level state
    pub fn header(&self) -> RegistryHeader {
        self.header
    }

    /// Settings the registry was built with
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Backing node store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give up the registry, keeping its store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Node with the lowest `begin`, `NodeId::NIL` when empty
    pub fn first_index(&self) -> NodeId {
        self.header.first_index
    }

    /// Node with the highest `begin`, `NodeId::NIL` when empty
    pub fn last_index(&self) -> NodeId {
        self.header.last_index
    }

    /// Highest id ever allocated
    pub fn max_index(&self) -> NodeId {
        self.header.max_index
    }

    /// Node produced by the most recent insert or split
    pub fn last_inserted(&self) -> NodeId {
        self.header.last_inserted
    }

    /// Number of live intervals
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True when no interval is stored
    pub fn is_empty(&self) -> bool {
        self.header.first_index.is_nil()
    }

    /// True when `id` names a live node
    pub fn contains_id(&self, id: NodeId) -> bool {
        !id.is_nil() && self.store.contains(id)
    }

    /// Load the live node `id`
    pub fn node(&self, id: NodeId) -> Result<Node> {
        if id.is_nil() {
            return Err(Error::NotFound(id));
        }
        self.store.load(id).ok_or(Error::NotFound(id))
    }

    /// Bounds `(begin, end)` of the live node `id`
    pub fn get(&self, id: NodeId) -> Result<(u64, u64)> {
        self.node(id).map(|node| node.bounds())
    }

    /// Successor of `id`, or `NodeId::NIL` at the tail
    pub fn next(&self, id: NodeId) -> Result<NodeId> {
        self.node(id).map(|node| node.next)
    }

    /// Predecessor of `id`, or `NodeId::NIL` at the head
    pub fn prev(&self, id: NodeId) -> Result<NodeId> {
        self.node(id).map(|node| node.prev)
    }

    /// Iterate over nodes in ascending order
    pub fn iter(&self) -> Iter<'_, S> {
        Iter {
            store: &self.store,
            cursor: self.header.first_index,
            remaining: self.store.len(),
        }
    }

    /// Node whose interval contains `point`
    pub fn find(&self, point: u64) -> Option<NodeId> {
        self.iter()
            .find(|node| node.end > point)
            .filter(|node| node.begin <= point)
            .map(|node| node.id)
    }

    /// Totals gathered in one walk of the list
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            interval_count: self.len(),
            max_index: self.header.max_index,
            covered: self
                .iter()
                .fold(0u64, |acc, node| acc.saturating_add(node.end - node.begin)),
        }
    }

    /// Insert `[begin, end)` between the hinted neighbours.
    ///
    /// `prev` and `next` must be the current immediate neighbours at the
    /// insertion point, with `NodeId::NIL` standing for the list boundary.
    /// The new interval is merged with any neighbour it touches. Returns the
    /// id of the node that ends up holding `[begin, end)`.
    pub fn insert(&mut self, prev: NodeId, next: NodeId, begin: u64, end: u64) -> Result<NodeId> {
        let plan = match self.check_insert(prev, next, begin, end) {
            Ok(plan) => plan,
            Err(err) => {
                debug!("rejected insert [{}, {}) between {} and {}: {}", begin, end, prev, next, err);
                return Err(err);
            }
        };

        let id = plan.id;
        self.header.max_index = id;

        let mut survivor = Node {
            id,
            begin,
            end,
            prev,
            next,
        };

        // Merge-left: the previous node grows over the new interval
        if let Some(mut left) = plan.prev.filter(|left| left.end == begin) {
            trace!("merging [{}, {}) into left node {}", begin, end, left.id);
            left.end = survivor.end;
            survivor = left;
        }

        // Merge-right, evaluated against whatever survived merge-left
        if let Some(mut right) = plan.next.filter(|right| right.begin == survivor.end) {
            if survivor.id == id {
                trace!("merging [{}, {}) into right node {}", begin, end, right.id);
                right.begin = survivor.begin;
                survivor = right;
            } else {
                trace!("merging right node {} into node {}", right.id, survivor.id);
                survivor.end = right.end;
                survivor.next = right.next;
                match plan.beyond {
                    Some(mut beyond) => {
                        beyond.prev = survivor.id;
                        self.store.store(beyond);
                    }
                    None => self.header.last_index = survivor.id,
                }
                self.store.erase(right.id);
            }
        }

        if survivor.id == id {
            match plan.prev {
                Some(mut left) => {
                    left.next = id;
                    self.store.store(left);
                }
                None => self.header.first_index = id,
            }
            match plan.next {
                Some(mut right) => {
                    right.prev = id;
                    self.store.store(right);
                }
                None => self.header.last_index = id,
            }
        }

        self.store.store(survivor);
        self.header.last_inserted = survivor.id;

        debug!(
            "inserted [{}, {}) as node {} now holding [{}, {})",
            begin, end, survivor.id, survivor.begin, survivor.end
        );
        self.after_mutation();
        Ok(survivor.id)
    }

    /// Insert `[begin, end)` at the position found by walking the list.
    ///
    /// Equivalent to calling [`insert`](Self::insert) with the correct hints.
    pub fn insert_sorted(&mut self, begin: u64, end: u64) -> Result<NodeId> {
        if begin >= end {
            return Err(InsertError::EmptyRange { begin, end }.into());
        }

        let mut prev = NodeId::NIL;
        let mut next = self.header.first_index;
        for node in self.iter() {
            if node.begin >= begin {
                break;
            }
            prev = node.id;
            next = node.next;
        }

        self.insert(prev, next, begin, end)
    }

    /// Remove `[begin, end)` from the interval stored at `id`.
    ///
    /// The range must lie inside that interval. Removing an interior range
    /// splits the node; the id of the new upper fragment is returned.
    pub fn remove(&mut self, id: NodeId, begin: u64, end: u64) -> Result<Option<NodeId>> {
        let (mut node, split) = match self.check_remove(id, begin, end) {
            Ok(checked) => checked,
            Err(err) => {
                debug!("rejected remove [{}, {}) from node {}: {}", begin, end, id, err);
                return Err(err);
            }
        };

        let fragment = match (begin == node.begin, end == node.end, split) {
            (_, _, Some(split_id)) => {
                let next = self.neighbour(id, node.next)?;
                self.header.max_index = split_id;

                let upper = Node {
                    id: split_id,
                    begin: end,
                    end: node.end,
                    prev: id,
                    next: node.next,
                };
                match next {
                    Some(mut next) => {
                        next.prev = split_id;
                        self.store.store(next);
                    }
                    None => self.header.last_index = split_id,
                }
                node.end = begin;
                node.next = split_id;
                self.store.store(node);
                self.store.store(upper);
                self.header.last_inserted = split_id;

                trace!(
                    "split node {} into [{}, {}) and node {} [{}, {})",
                    id, node.begin, node.end, split_id, upper.begin, upper.end
                );
                debug!("removed [{}, {}) from node {}", begin, end, id);
                Some(split_id)
            }
            (true, true, None) => {
                let prev = self.neighbour(id, node.prev)?;
                let next = self.neighbour(id, node.next)?;

                match prev {
                    Some(mut prev) => {
                        prev.next = node.next;
                        self.store.store(prev);
                    }
                    None => self.header.first_index = node.next,
                }
                match next {
                    Some(mut next) => {
                        next.prev = node.prev;
                        self.store.store(next);
                    }
                    None => self.header.last_index = node.prev,
                }
                self.store.erase(id);
                debug!("removed node {} holding [{}, {})", id, begin, end);
                None
            }
            (true, false, None) => {
                node.begin = end;
                self.store.store(node);
                debug!("trimmed node {} to [{}, {})", id, node.begin, node.end);
                None
            }
            (false, _, None) => {
                node.end = begin;
                self.store.store(node);
                debug!("trimmed node {} to [{}, {})", id, node.begin, node.end);
                None
            }
        };

        self.after_mutation();
        Ok(fragment)
    }

    /// Check every structural invariant of the list
    pub fn validate(&self) -> Result<()> {
        let stored = self.store.len();
        let mut reachable = 0usize;
        let mut previous: Option<Node> = None;
        let mut cursor = self.header.first_index;

        while !cursor.is_nil() {
            let from = previous.map_or(NodeId::NIL, |node| node.id);
            let node = self
                .store
                .load(cursor)
                .filter(|node| node.id == cursor)
                .ok_or(Corruption::DanglingLink { from, to: cursor })?;

            if reachable == stored {
                // More links than nodes, so the walk has looped
                return Err(Corruption::CountMismatch {
                    reachable: reachable + 1,
                    stored,
                }
                .into());
            }

            if node.id > self.header.max_index {
                return Err(Corruption::IdOutOfRange {
                    id: node.id,
                    max_index: self.header.max_index,
                }
                .into());
            }
            if node.begin >= node.end {
                return Err(Corruption::EmptyNode { id: node.id }.into());
            }
            if node.prev != from {
                return Err(Corruption::BrokenBacklink {
                    id: node.id,
                    expected: from,
                    found: node.prev,
                }
                .into());
            }
            if let Some(left) = previous {
                if left.end >= node.begin {
                    return Err(Corruption::Unordered {
                        left: left.id,
                        right: node.id,
                    }
                    .into());
                }
            }

            reachable += 1;
            previous = Some(node);
            cursor = node.next;
        }

        let tail = previous.map_or(NodeId::NIL, |node| node.id);
        if tail != self.header.last_index {
            return Err(Corruption::TailMismatch {
                expected: tail,
                found: self.header.last_index,
            }
            .into());
        }
        if reachable != stored {
            return Err(Corruption::CountMismatch { reachable, stored }.into());
        }
        if self.header.last_inserted > self.header.max_index {
            return Err(Corruption::IdOutOfRange {
                id: self.header.last_inserted,
                max_index: self.header.max_index,
            }
            .into());
        }

        Ok(())
    }

    fn check_insert(&self, prev: NodeId, next: NodeId, begin: u64, end: u64) -> Result<InsertPlan> {
        if begin >= end {
            return Err(InsertError::EmptyRange { begin, end }.into());
        }

        let prev_node = self.hint(prev)?;
        let next_node = self.hint(next)?;

        let after_prev = prev_node.map_or(self.header.first_index, |node| node.next);
        if after_prev != next {
            return Err(InsertError::NotAdjacent { prev, next }.into());
        }

        if let Some(left) = prev_node {
            if begin < left.end {
                return Err(InsertError::OverlapsPrev {
                    prev,
                    prev_end: left.end,
                    begin,
                }
                .into());
            }
        }

        let mut beyond = None;
        if let Some(right) = next_node {
            if end > right.begin {
                return Err(InsertError::OverlapsNext {
                    next,
                    next_begin: right.begin,
                    end,
                }
                .into());
            }
            let merges_both = prev_node.is_some_and(|left| left.end == begin) && right.begin == end;
            if merges_both {
                beyond = self.neighbour(next, right.next)?;
            }
        }

        let id = self
            .header
            .max_index
            .successor()
            .ok_or(InsertError::IdsExhausted)?;

        Ok(InsertPlan {
            id,
            prev: prev_node,
            next: next_node,
            beyond,
        })
    }

    /// Validate a remove, returning the target and the id a split would take
    fn check_remove(&self, id: NodeId, begin: u64, end: u64) -> Result<(Node, Option<NodeId>)> {
        let node = self
            .node(id)
            .map_err(|_| Error::from(RemoveError::DeadNode(id)))?;

        if begin >= end {
            return Err(RemoveError::EmptyRange { begin, end }.into());
        }
        if begin < node.begin || end > node.end {
            return Err(RemoveError::NotContained {
                id,
                begin,
                end,
                node_begin: node.begin,
                node_end: node.end,
            }
            .into());
        }

        let mut split = None;
        if begin > node.begin && end < node.end {
            split = Some(
                self.header
                    .max_index
                    .successor()
                    .ok_or(RemoveError::IdsExhausted)?,
            );
        }

        Ok((node, split))
    }

    /// Resolve an insert hint, `None` for the boundary
    fn hint(&self, id: NodeId) -> Result<Option<Node>> {
        if id.is_nil() {
            return Ok(None);
        }
        self.store
            .load(id)
            .map(Some)
            .ok_or_else(|| InsertError::DeadHint(id).into())
    }

    /// Resolve a link stored in node `from`, `None` for the boundary
    fn neighbour(&self, from: NodeId, to: NodeId) -> Result<Option<Node>> {
        if to.is_nil() {
            return Ok(None);
        }
        self.store
            .load(to)
            .map(Some)
            .ok_or_else(|| Corruption::DanglingLink { from, to }.into())
    }

    fn after_mutation(&self) {
        if self.config.verify_invariants {
            if let Err(err) = self.validate() {
                error!("interval registry invariant violated: {}", err);
            }
        }
    }
}

impl<'a, S: NodeStore> IntoIterator for &'a IntervalRegistry<S> {
    type Item = Node;
    type IntoIter = Iter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over registry nodes in ascending order.
///
/// Created by [`IntervalRegistry::iter`]. Stops after visiting as many nodes
/// as the store holds, so a corrupted link cannot make it loop forever.
pub struct Iter<'a, S> {
    store: &'a S,
    cursor: NodeId,
    remaining: usize,
}

impl<'a, S: NodeStore> Iterator for Iter<'a, S> {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        if self.cursor.is_nil() || self.remaining == 0 {
            return None;
        }
        let node = self.store.load(self.cursor)?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.cursor.is_nil() {
            (0, Some(0))
        } else {
            (0, Some(self.remaining))
        }
    }
}

impl<'a, S: NodeStore> std::iter::FusedIterator for Iter<'a, S> {}
