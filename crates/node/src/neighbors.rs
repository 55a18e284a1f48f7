//! Bounded, ordered neighbor set.

use crate::error::NeighborError;
use gossipsim_types::{MigrationError, MigrationPayload, MigrationRecord, NodeIndex, MAX_DYNAMIC_RECORDS};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Neighbor ids of one node.
///
/// Keys and values are both the peer id, which is the shape migration
/// records carry. Iteration is ascending by id, so forwarding order never
/// depends on insertion history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborSet {
    entries: BTreeMap<NodeIndex, NodeIndex>,
}

impl NeighborSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, peer: NodeIndex) -> Result<(), NeighborError> {
        if self.entries.contains_key(&peer) {
            return Err(NeighborError::AlreadyPresent);
        }
        if self.entries.len() >= MAX_DYNAMIC_RECORDS {
            return Err(NeighborError::CapacityExceeded {
                capacity: MAX_DYNAMIC_RECORDS,
            });
        }
        self.entries.insert(peer, peer);
        Ok(())
    }

    pub fn remove(&mut self, peer: NodeIndex) -> Result<(), NeighborError> {
        self.entries
            .remove(&peer)
            .map(|_| ())
            .ok_or(NeighborError::NotPresent)
    }

    pub fn contains(&self, peer: NodeIndex) -> bool {
        self.entries.contains_key(&peer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.entries.keys().copied()
    }

    /// Uniformly random member, `None` when empty.
    pub fn random(&self, rng: &mut ChaCha8Rng) -> Option<NodeIndex> {
        if self.entries.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.entries.len());
        self.entries.keys().nth(index).copied()
    }

    /// Uniformly random member other than `excluded`.
    ///
    /// When `excluded` is the only member it is returned, so a node with a
    /// single link can still pass the request on.
    pub fn random_except(&self, rng: &mut ChaCha8Rng, excluded: NodeIndex) -> Option<NodeIndex> {
        if self.entries.len() == 1 || !self.contains(excluded) {
            return self.random(rng);
        }
        let index = rng.gen_range(0..self.entries.len() - 1);
        self.entries.keys().copied().filter(|&peer| peer != excluded).nth(index)
    }

    /// Removes every member, returning them in ascending order.
    pub fn drain(&mut self) -> Vec<NodeIndex> {
        std::mem::take(&mut self.entries).into_keys().collect()
    }

    pub fn to_payload(&self) -> Result<MigrationPayload, MigrationError> {
        MigrationPayload::new(
            self.entries
                .iter()
                .map(|(&key, &value)| MigrationRecord { key, value })
                .collect(),
        )
    }

    /// Replaces the current contents with the payload's records.
    pub fn from_payload(payload: &MigrationPayload) -> Self {
        Self {
            entries: payload
                .records()
                .iter()
                .map(|record| (record.key, record.value))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut set = NeighborSet::new();
        set.insert(4).unwrap();
        assert_eq!(set.insert(4), Err(NeighborError::AlreadyPresent));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut set = NeighborSet::new();
        for peer in 0..MAX_DYNAMIC_RECORDS as NodeIndex {
            set.insert(peer).unwrap();
        }
        assert_eq!(
            set.insert(9999),
            Err(NeighborError::CapacityExceeded {
                capacity: MAX_DYNAMIC_RECORDS
            })
        );
        // Duplicates are still reported as such at capacity.
        assert_eq!(set.insert(0), Err(NeighborError::AlreadyPresent));
    }

    #[test]
    fn test_remove_missing() {
        let mut set = NeighborSet::new();
        assert_eq!(set.remove(1), Err(NeighborError::NotPresent));
        set.insert(1).unwrap();
        assert_eq!(set.remove(1), Ok(()));
        assert!(set.is_empty());
    }

    #[test]
    fn test_random_is_uniform_enough() {
        let mut set = NeighborSet::new();
        for peer in [3, 17, 42, 99] {
            set.insert(peer).unwrap();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut counts = BTreeMap::new();
        for _ in 0..4000 {
            *counts.entry(set.random(&mut rng).unwrap()).or_insert(0u32) += 1;
        }
        assert_eq!(counts.len(), 4);
        for (peer, count) in counts {
            assert!((800..1200).contains(&count), "peer {peer} drawn {count} times");
        }
    }

    #[test]
    fn test_random_on_empty_set() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(NeighborSet::new().random(&mut rng), None);
    }

    #[test]
    fn test_random_except_skips_excluded_member() {
        let mut set = NeighborSet::new();
        for peer in [1, 2, 3] {
            set.insert(peer).unwrap();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut counts = BTreeMap::new();
        for _ in 0..3000 {
            *counts.entry(set.random_except(&mut rng, 2).unwrap()).or_insert(0u32) += 1;
        }
        assert_eq!(counts.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        for (peer, count) in counts {
            assert!((1300..1700).contains(&count), "peer {peer} drawn {count} times");
        }
    }

    #[test]
    fn test_random_except_sole_member_falls_back() {
        let mut set = NeighborSet::new();
        set.insert(4).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(set.random_except(&mut rng, 4), Some(4));
        assert_eq!(NeighborSet::new().random_except(&mut rng, 4), None);
    }

    #[test]
    fn test_payload_restores_identical_set() {
        let mut set = NeighborSet::new();
        for peer in [12, 5, 300, 7] {
            set.insert(peer).unwrap();
        }
        let payload = set.to_payload().unwrap();
        assert_eq!(
            payload.records().iter().map(|r| r.key).collect::<Vec<_>>(),
            vec![5, 7, 12, 300]
        );
        assert_eq!(NeighborSet::from_payload(&payload), set);
    }

    #[test]
    fn test_drain_empties_in_order() {
        let mut set = NeighborSet::new();
        for peer in [9, 1, 5] {
            set.insert(peer).unwrap();
        }
        assert_eq!(set.drain(), vec![1, 5, 9]);
        assert!(set.is_empty());
    }
}
