//! Per-node record held by the runner.

use crate::error::NeighborError;
use crate::neighbors::NeighborSet;
use gossipsim_core::PeerView;
use gossipsim_types::{MigrationError, MigrationPayload, NodeIndex, NodeStatus, ReceivedMarker};
use rand_chacha::ChaCha8Rng;

/// Advertised degree.
///
/// Not maintained until [`NodeState::sync_degree`] runs once; before that it
/// reads as 0, which peers treat as "unknown". After the sync every
/// successful insert or remove moves it by one, while attach and detach
/// overwrite it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DegreeCache {
    value: u32,
    synced: bool,
}

impl DegreeCache {
    pub fn value(self) -> u32 {
        self.value
    }

    pub fn is_synced(self) -> bool {
        self.synced
    }
}

/// State of one simulated node.
#[derive(Debug, Clone)]
pub struct NodeState {
    id: NodeIndex,
    /// Logical process currently hosting this node.
    lp: u32,
    status: NodeStatus,
    neighbors: NeighborSet,
    degree: DegreeCache,
    received: ReceivedMarker,
}

impl NodeState {
    pub fn new(id: NodeIndex, lp: u32) -> Self {
        Self {
            id,
            lp,
            status: NodeStatus::Active,
            neighbors: NeighborSet::new(),
            degree: DegreeCache::default(),
            received: ReceivedMarker::None,
        }
    }

    pub fn id(&self) -> NodeIndex {
        self.id
    }

    pub fn lp(&self) -> u32 {
        self.lp
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn set_status(&mut self, status: NodeStatus) {
        self.status = status;
    }

    pub fn received(&self) -> ReceivedMarker {
        self.received
    }

    pub fn set_received(&mut self, marker: ReceivedMarker) {
        self.received = marker;
    }

    pub fn neighbors(&self) -> &NeighborSet {
        &self.neighbors
    }

    /// True size of the neighbor set.
    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Degree this node advertises to peers.
    pub fn advertised_degree(&self) -> u32 {
        self.degree.value
    }

    pub fn degree_cache(&self) -> DegreeCache {
        self.degree
    }

    pub fn insert_neighbor(&mut self, peer: NodeIndex) -> Result<(), NeighborError> {
        self.neighbors.insert(peer)?;
        if self.degree.synced {
            self.degree.value += 1;
        }
        Ok(())
    }

    pub fn remove_neighbor(&mut self, peer: NodeIndex) -> Result<(), NeighborError> {
        self.neighbors.remove(peer)?;
        if self.degree.synced {
            self.degree.value = self.degree.value.saturating_sub(1);
        }
        Ok(())
    }

    pub fn random_neighbor(&self, rng: &mut ChaCha8Rng) -> Option<NodeIndex> {
        self.neighbors.random(rng)
    }

    pub fn random_neighbor_except(
        &self,
        rng: &mut ChaCha8Rng,
        excluded: NodeIndex,
    ) -> Option<NodeIndex> {
        self.neighbors.random_except(rng, excluded)
    }

    /// One-time copy of the true neighbor count into the cache.
    pub fn sync_degree(&mut self) {
        self.degree = DegreeCache {
            value: self.neighbors.len() as u32,
            synced: true,
        };
    }

    pub(crate) fn set_advertised_degree(&mut self, value: u32) {
        self.degree.value = value;
    }

    pub(crate) fn drain_neighbors(&mut self) -> Vec<NodeIndex> {
        self.neighbors.drain()
    }

    pub fn peer_view(&self) -> PeerView {
        PeerView {
            id: self.id,
            status: self.status,
            degree: self.degree.value,
        }
    }

    // ─── Migration ───

    pub fn export_migration(&self) -> Result<MigrationPayload, MigrationError> {
        self.neighbors.to_payload()
    }

    /// Replaces the neighbor set with an exported one and moves the node to `lp`.
    pub fn import_migration(&mut self, lp: u32, payload: &MigrationPayload) {
        self.neighbors = NeighborSet::from_payload(payload);
        self.lp = lp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_ignores_changes_before_sync() {
        let mut node = NodeState::new(0, 0);
        node.insert_neighbor(1).unwrap();
        node.insert_neighbor(2).unwrap();
        assert_eq!(node.advertised_degree(), 0);
        assert_eq!(node.neighbor_count(), 2);

        node.sync_degree();
        assert!(node.degree_cache().is_synced());
        assert_eq!(node.advertised_degree(), 2);
    }

    #[test]
    fn test_cache_tracks_successful_changes_after_sync() {
        let mut node = NodeState::new(0, 0);
        node.sync_degree();
        node.insert_neighbor(1).unwrap();
        assert_eq!(node.insert_neighbor(1), Err(NeighborError::AlreadyPresent));
        assert_eq!(node.advertised_degree(), 1);

        assert_eq!(node.remove_neighbor(5), Err(NeighborError::NotPresent));
        assert_eq!(node.advertised_degree(), 1);
        node.remove_neighbor(1).unwrap();
        assert_eq!(node.advertised_degree(), 0);
    }

    #[test]
    fn test_migration_round_trip() {
        let mut node = NodeState::new(3, 0);
        for peer in [8, 1, 4] {
            node.insert_neighbor(peer).unwrap();
        }
        let payload = node.export_migration().unwrap();

        let mut moved = NodeState::new(3, 0);
        moved.import_migration(2, &payload);
        assert_eq!(moved.neighbors(), node.neighbors());
        assert_eq!(moved.lp(), 2);
    }
}
