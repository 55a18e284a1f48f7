//! Scheduling and directory abstractions.
//!
//! The simulation runner implements both on top of its event queue and node
//! table. Unit tests implement them with a `Vec` and a fixed peer list.

use crate::OutboxEntry;
use gossipsim_types::{NodeIndex, NodeStatus};

/// Accepts messages for later delivery.
pub trait Scheduler {
    fn schedule(&mut self, entry: OutboxEntry);
}

impl Scheduler for Vec<OutboxEntry> {
    fn schedule(&mut self, entry: OutboxEntry) {
        self.push(entry);
    }
}

/// What a node may observe about a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerView {
    pub id: NodeIndex,
    pub status: NodeStatus,
    /// The peer's advertised degree, not its true neighbor count.
    pub degree: u32,
}

/// Read-only lookup of nodes by id.
pub trait NodeDirectory {
    /// Number of entity ids in the run. Valid ids are `0..total_nodes()`.
    fn total_nodes(&self) -> usize;

    /// `None` when `id` is not an entity.
    fn peer(&self, id: NodeIndex) -> Option<PeerView>;
}
