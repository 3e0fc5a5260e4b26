//! Node and interval value types for the interval registry
//!
//! Nodes never hold references to each other. Every link is a [`NodeId`]
//! that has to be looked up in the backing store, with [`NodeId::NIL`]
//! marking the list boundaries.

use std::fmt;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Identifier of a node in the registry.
///
/// Ids are assigned monotonically starting from 1 and never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(transparent))]
pub struct NodeId(u64);

impl NodeId {
    /// The "no node" sentinel
    pub const NIL: NodeId = NodeId(0);

    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is the sentinel
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }

    /// The id following this one in allocation order, `None` once ids run out
    pub(crate) fn successor(self) -> Option<NodeId> {
        self.0.checked_add(1).map(NodeId)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A half-open range `[begin, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Interval {
    /// First point in the interval (inclusive)
    pub begin: u64,
    /// First point past the interval (exclusive)
    pub end: u64,
}

impl Interval {
    /// Create `[begin, end)`
    pub const fn new(begin: u64, end: u64) -> Self {
        Self { begin, end }
    }

    /// Zero-width and inverted intervals are both empty
    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    /// Number of points covered
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.begin)
    }

    /// True if `point` lies inside the interval
    pub fn contains(&self, point: u64) -> bool {
        point >= self.begin && point < self.end
    }

    /// True if `other` lies entirely inside this interval
    pub fn contains_range(&self, other: &Interval) -> bool {
        other.begin >= self.begin && other.end <= self.end
    }

    /// True if the two intervals overlap or share a boundary point
    pub fn touches(&self, other: &Interval) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.begin, self.end)
    }
}

/// A stored interval together with its list links.
///
/// This is the fixed-size record kept by a [`crate::storage::NodeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Node {
    /// Id the node is stored under
    pub id: NodeId,
    /// First point covered (inclusive)
    pub begin: u64,
    /// First point past the interval (exclusive)
    pub end: u64,
    /// Preceding node in ascending order, or `NodeId::NIL` at the head
    pub prev: NodeId,
    /// Following node in ascending order, or `NodeId::NIL` at the tail
    pub next: NodeId,
}

impl Node {
    /// Create an unlinked node
    pub fn new(id: NodeId, begin: u64, end: u64) -> Self {
        Self {
            id,
            begin,
            end,
            prev: NodeId::NIL,
            next: NodeId::NIL,
        }
    }

    /// The covered range as an [`Interval`]
    pub fn interval(&self) -> Interval {
        Interval::new(self.begin, self.end)
    }

    /// The covered range as a `(begin, end)` pair
    pub fn bounds(&self) -> (u64, u64) {
        (self.begin, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_sentinel() {
        assert!(NodeId::NIL.is_nil());
        assert!(!NodeId::new(1).is_nil());
        assert_eq!(NodeId::default(), NodeId::NIL);
        assert_eq!(NodeId::new(7).successor(), Some(NodeId::new(8)));
        assert_eq!(NodeId::new(u64::MAX).successor(), None);
        assert_eq!(u64::from(NodeId::from(42)), 42);
        assert_eq!(NodeId::new(3).to_string(), "3");
    }

    #[test]
    fn test_interval_basic() {
        let interval = Interval::new(100, 200);

        assert_eq!(interval.len(), 100);
        assert!(!interval.is_empty());
        assert!(interval.contains(100));
        assert!(interval.contains(199));
        assert!(!interval.contains(200));
        assert!(!interval.contains(99));
        assert_eq!(interval.to_string(), "[100,200)");

        assert!(Interval::new(5, 5).is_empty());
        assert!(Interval::new(6, 5).is_empty());
        assert_eq!(Interval::new(6, 5).len(), 0);
    }

    #[test]
    fn test_interval_relations() {
        let interval = Interval::new(100, 200);

        assert!(interval.contains_range(&Interval::new(100, 200)));
        assert!(interval.contains_range(&Interval::new(150, 160)));
        assert!(!interval.contains_range(&Interval::new(50, 150)));
        assert!(!interval.contains_range(&Interval::new(150, 250)));

        assert!(interval.touches(&Interval::new(200, 300))); // Shared boundary
        assert!(interval.touches(&Interval::new(0, 100)));
        assert!(interval.touches(&Interval::new(150, 250)));
        assert!(!interval.touches(&Interval::new(201, 300)));
        assert!(!interval.touches(&Interval::new(0, 99)));
    }

    #[test]
    fn test_node_new_is_unlinked() {
        let node = Node::new(NodeId::new(4), 10, 20);

        assert_eq!(node.prev, NodeId::NIL);
        assert_eq!(node.next, NodeId::NIL);
        assert_eq!(node.interval(), Interval::new(10, 20));
        assert_eq!(node.bounds(), (10, 20));
    }
}
