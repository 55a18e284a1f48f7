//! Errors raised by node logic.
//!
//! [`NeighborError`] is local to the entity store; callers decide which
//! variants are fatal. [`NodeError`] is always fatal and carries the tick
//! and the ids involved.

use gossipsim_types::{MigrationError, NodeIndex, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NeighborError {
    #[error("neighbor already present")]
    AlreadyPresent,

    #[error("neighbor not present")]
    NotPresent,

    #[error("neighbor set is full ({capacity} entries)")]
    CapacityExceeded { capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("tick {tick}: node {node} cannot add neighbor {peer}, set is full ({capacity})")]
    NeighborCapacity {
        tick: Tick,
        node: NodeIndex,
        peer: NodeIndex,
        capacity: usize,
    },

    #[error("tick {tick}: message {from} -> {to} is {size} bytes, buffer holds {limit}")]
    PayloadTooLarge {
        tick: Tick,
        from: NodeIndex,
        to: NodeIndex,
        size: usize,
        limit: usize,
    },

    #[error("tick {tick}: migration of node {node} failed: {source}")]
    Migration {
        tick: Tick,
        node: NodeIndex,
        #[source]
        source: MigrationError,
    },
}
