//! Interval Registry: ordered, id-addressed free-space tracking
//!
//! This crate keeps an ordered collection of disjoint half-open integer
//! intervals `[begin, end)`. Intervals live in a doubly linked list whose
//! links are plain integer ids looked up in a record store, so the structure
//! maps directly onto key-value backed storage. Touching intervals are always
//! coalesced on insert, and removing a sub-range shrinks or splits the
//! interval that holds it.

#![warn(missing_docs)]

/// Interval values, nodes and the registry itself
pub mod interval;

/// Id-addressed node stores
pub mod storage;

/// Shared handle serializing concurrent callers
pub mod shared;

/// Line-oriented command scripts driving a registry
pub mod script;


// Re-exports
pub use config::RegistryConfig;
pub use error::{Corruption, Error, InsertError, RemoveError, Result};
pub use interval::{
    Interval, IntervalRegistry, Iter, Node, NodeId, RegistryHeader, RegistrySnapshot,
    RegistryStats,
};
pub use shared::SharedRegistry;
pub use storage::{MemoryStore, NodeStore, RecordStore};

/// Error types for registry operations
pub mod error {
    use crate::interval::NodeId;

    /// Error types that can occur in registry operations.
    ///
    /// Every error is terminal for the call that produced it: the registry is
    /// left exactly as it was before the call.
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum Error {
        /// A read named id 0 or an id with no live node
        #[error("node {0} not found")]
        NotFound(NodeId),
        /// An insert was rejected
        #[error("invalid insert: {0}")]
        InvalidInsert(#[from] InsertError),
        /// A remove was rejected
        #[error("invalid remove: {0}")]
        InvalidRemove(#[from] RemoveError),
        /// Stored state breaks a list invariant
        #[error("registry corrupted: {0}")]
        Corrupted(#[from] Corruption),
    }

    /// Reasons an insert is rejected
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum InsertError {
        /// Zero-width or inverted bounds
        #[error("interval [{begin}, {end}) is empty")]
        EmptyRange {
            /// Requested begin
            begin: u64,
            /// Requested end
            end: u64,
        },
        /// A hint names no live node
        #[error("hint {0} does not name a live node")]
        DeadHint(NodeId),
        /// The hints are not immediate neighbours
        #[error("node {next} does not follow node {prev}")]
        NotAdjacent {
            /// Previous hint
            prev: NodeId,
            /// Next hint
            next: NodeId,
        },
        /// The interval starts inside the previous node
        #[error("begin {begin} precedes end {prev_end} of node {prev}")]
        OverlapsPrev {
            /// Previous hint
            prev: NodeId,
            /// End of the previous node
            prev_end: u64,
            /// Requested begin
            begin: u64,
        },
        /// The interval ends inside the next node
        #[error("end {end} passes begin {next_begin} of node {next}")]
        OverlapsNext {
            /// Next hint
            next: NodeId,
            /// Begin of the next node
            next_begin: u64,
            /// Requested end
            end: u64,
        },
        /// Every id up to `u64::MAX` has been allocated
        #[error("node ids are exhausted")]
        IdsExhausted,
    }

    /// Reasons a remove is rejected
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum RemoveError {
        /// The id names no live node
        #[error("node {0} is not live")]
        DeadNode(NodeId),
        /// Zero-width or inverted bounds
        #[error("range [{begin}, {end}) is empty")]
        EmptyRange {
            /// Requested begin
            begin: u64,
            /// Requested end
            end: u64,
        },
        /// The range reaches outside the named interval
        #[error("range [{begin}, {end}) is not inside node {id} [{node_begin}, {node_end})")]
        NotContained {
            /// Target node
            id: NodeId,
            /// Requested begin
            begin: u64,
            /// Requested end
            end: u64,
            /// Current begin of the node
            node_begin: u64,
            /// Current end of the node
            node_end: u64,
        },
        /// A split needs a fresh id and none is left
        #[error("node ids are exhausted")]
        IdsExhausted,
    }

    /// Invariant violations found by [`crate::IntervalRegistry::validate`]
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum Corruption {
        /// A link points at a missing node
        #[error("node {from} links to missing node {to}")]
        DanglingLink {
            /// Node holding the link, 0 for the header
            from: NodeId,
            /// Missing target
            to: NodeId,
        },
        /// `prev` does not mirror the preceding `next`
        #[error("node {id} has prev {found}, expected {expected}")]
        BrokenBacklink {
            /// Offending node
            id: NodeId,
            /// Node that links to it
            expected: NodeId,
            /// Stored prev link
            found: NodeId,
        },
        /// A node with `begin >= end`
        #[error("node {id} holds an empty interval")]
        EmptyNode {
            /// Offending node
            id: NodeId,
        },
        /// Neighbours overlap, touch or are out of order
        #[error("nodes {left} and {right} overlap or touch")]
        Unordered {
            /// Earlier node
            left: NodeId,
            /// Later node
            right: NodeId,
        },
        /// An id above the allocation counter
        #[error("id {id} exceeds max index {max_index}")]
        IdOutOfRange {
            /// Offending id
            id: NodeId,
            /// Current counter
            max_index: NodeId,
        },
        /// The header tail is not the last reachable node
        #[error("tail is {found}, last reachable node is {expected}")]
        TailMismatch {
            /// Last node reached by the walk
            expected: NodeId,
            /// Tail stored in the header
            found: NodeId,
        },
        /// The walk and the store disagree on the node count
        #[error("{reachable} nodes reachable, {stored} stored")]
        CountMismatch {
            /// Nodes visited by the walk
            reachable: usize,
            /// Nodes held by the store
            stored: usize,
        },
    }

    /// Result alias for registry operations
    pub type Result<T> = std::result::Result<T, Error>;
}

/// Configuration options for the registry
pub mod config {
    /// Configuration for an interval registry
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RegistryConfig {
        /// Number of nodes to reserve room for up front
        pub initial_capacity: usize,
        /// Run a full invariant check after every committed mutation
        pub verify_invariants: bool,
    }

    impl Default for RegistryConfig {
        fn default() -> Self {
            Self {
                initial_capacity: 1024,
                verify_invariants: cfg!(debug_assertions),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::from(InsertError::EmptyRange { begin: 5, end: 3 });
        assert_eq!(err.to_string(), "invalid insert: interval [5, 3) is empty");

        let err = Error::from(RemoveError::NotContained {
            id: NodeId::new(2),
            begin: 50,
            end: 150,
            node_begin: 101,
            node_end: 300,
        });
        assert_eq!(
            err.to_string(),
            "invalid remove: range [50, 150) is not inside node 2 [101, 300)"
        );

        assert_eq!(Error::NotFound(NodeId::NIL).to_string(), "node 0 not found");
    }

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.initial_capacity, 1024);
        assert_eq!(config.verify_invariants, cfg!(debug_assertions));
    }
}
