//! Fixtures for unit tests: a fixed peer table and an owning context.

use crate::config::ProtocolConfig;
use crate::context::{EpochRoles, NodeContext};
use crate::stats::DisseminationStats;
use gossipsim_core::{NodeDirectory, OutboxEntry, PeerView};
use gossipsim_types::{Message, NodeIndex, NodeStatus, Tick};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub(crate) struct StaticDirectory {
    pub peers: Vec<PeerView>,
}

impl NodeDirectory for StaticDirectory {
    fn total_nodes(&self) -> usize {
        self.peers.len()
    }

    fn peer(&self, id: NodeIndex) -> Option<PeerView> {
        self.peers.get(id as usize).copied()
    }
}

pub(crate) struct Harness {
    pub config: ProtocolConfig,
    pub roles: EpochRoles,
    pub rng: ChaCha8Rng,
    pub directory: StaticDirectory,
    pub outbox: Vec<OutboxEntry>,
    pub stats: DisseminationStats,
}

impl Harness {
    /// `total_nodes` active peers with advertised degree 0.
    pub fn new(config: ProtocolConfig, total_nodes: u32) -> Self {
        Self {
            config,
            roles: EpochRoles::default(),
            rng: ChaCha8Rng::seed_from_u64(42),
            directory: StaticDirectory {
                peers: (0..total_nodes)
                    .map(|id| PeerView {
                        id,
                        status: NodeStatus::Active,
                        degree: 0,
                    })
                    .collect(),
            },
            outbox: Vec::new(),
            stats: DisseminationStats::default(),
        }
    }

    pub fn set_peer(&mut self, id: NodeIndex, status: NodeStatus, degree: u32) {
        self.directory.peers[id as usize] = PeerView { id, status, degree };
    }

    pub fn ctx(&mut self, now: Tick) -> NodeContext<'_> {
        NodeContext {
            now,
            config: &self.config,
            roles: self.roles,
            rng: &mut self.rng,
            directory: &self.directory,
            outbox: &mut self.outbox,
            stats: &mut self.stats,
        }
    }

    /// Recipients of scheduled requests, sorted.
    pub fn request_targets(&self) -> Vec<NodeIndex> {
        let mut targets: Vec<_> = self
            .outbox
            .iter()
            .filter(|entry| matches!(entry.message, Message::Request(_)))
            .map(|entry| entry.to)
            .collect();
        targets.sort_unstable();
        targets
    }

    /// `(from, to)` of every scheduled message of the given kind.
    pub fn sent(&self, kind: &str) -> Vec<(NodeIndex, NodeIndex)> {
        self.outbox
            .iter()
            .filter(|entry| entry.message.type_name() == kind)
            .map(|entry| (entry.from, entry.to))
            .collect()
    }
}
