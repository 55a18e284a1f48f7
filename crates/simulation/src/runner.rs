//! Deterministic simulation runner.
//!
//! One tick is processed as:
//!
//! 1. load the initial topology (only at `building_step + 1`)
//! 2. at epoch boundaries, choose the applicant and holder
//! 3. run per-tick control for every node, in `(lp, id)` order, while
//!    `building_step <= now < end_clock - max_ttl`
//! 4. migrate a node, when migration is enabled and due
//! 5. deliver every message due at this tick
//!
//! Everything a node sends is delivered `FLIGHT_TIME` ticks later, so
//! messages produced in step 5 wait for the next tick.

use crate::config::{SimulationConfig, TopologySource};
use crate::directory::split_node;
use crate::error::SimulationError;
use crate::event_queue::{Delivery, EventKey};
use crate::roles::select_roles;
use crate::topology::EdgeList;
use gossipsim_core::OutboxEntry;
use gossipsim_node::{
    on_message, on_tick, DisseminationStats, EpochRoles, NeighborError, NodeContext, NodeError,
    NodeState,
};
use gossipsim_types::{Message, NodeIndex, Tick, FLIGHT_TIME};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Deterministic simulation runner.
///
/// Processes ticks and deliveries in a fixed order with a single seeded
/// random stream. Given the same seed and configuration, produces identical
/// results every run.
pub struct SimulationRunner {
    /// All nodes, indexed by `NodeIndex`.
    nodes: Vec<NodeState>,

    /// Pending deliveries, ordered deterministically.
    event_queue: BTreeMap<EventKey, Delivery>,

    /// Sequence counter for FIFO ordering within a key.
    sequence: u64,

    /// Last processed tick.
    now: Tick,

    config: SimulationConfig,

    /// The only source of randomness in the run.
    rng: ChaCha8Rng,

    /// Roles of the current epoch.
    roles: EpochRoles,

    /// Node ids sorted by `(lp, id)`.
    processing_order: Vec<NodeIndex>,

    stats: SimulationStats,
}

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    pub ticks: u64,
    /// Deliveries handed to nodes.
    pub events_processed: u64,
    pub messages_scheduled: u64,
    /// Scheduled messages, indexed by `EventPriority`.
    pub messages_by_priority: [u64; 2],
    pub topology_edges_loaded: u64,
    pub migrations: u64,
    /// Boundaries where fewer than two nodes were active.
    pub epochs_without_roles: u64,
    pub dissemination: DisseminationStats,
}

impl SimulationRunner {
    pub fn new(config: SimulationConfig, seed: u64) -> Result<Self, SimulationError> {
        config.validate()?;

        let nodes: Vec<NodeState> = (0..config.num_nodes)
            .map(|id| NodeState::new(id, id % config.num_lps))
            .collect();

        info!(
            nodes = config.num_nodes,
            lps = config.num_lps,
            mode = config.protocol.mode.name(),
            max_ttl = config.protocol.max_ttl,
            active_target = config.protocol.active_target_percent,
            seed,
            "Created simulation runner"
        );

        let mut runner = Self {
            nodes,
            event_queue: BTreeMap::new(),
            sequence: 0,
            now: 0,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            roles: EpochRoles::default(),
            processing_order: Vec::new(),
            stats: SimulationStats::default(),
        };
        runner.rebuild_processing_order();
        Ok(runner)
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn roles(&self) -> EpochRoles {
        self.roles
    }

    pub fn node(&self, id: NodeIndex) -> Option<&NodeState> {
        self.nodes.get(id as usize)
    }

    pub fn nodes(&self) -> &[NodeState] {
        &self.nodes
    }

    pub fn active_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.status().is_active())
            .count()
    }

    /// Number of deliveries still queued.
    pub fn pending_deliveries(&self) -> usize {
        self.event_queue.len()
    }

    /// Current neighbor sets as directed edges.
    pub fn snapshot_edges(&self) -> EdgeList {
        EdgeList::new(
            self.nodes
                .iter()
                .flat_map(|node| node.neighbors().iter().map(move |peer| (node.id(), peer)))
                .collect(),
        )
    }

    /// Runs ticks until `end` has been processed.
    pub fn run_until(&mut self, end: Tick) -> Result<(), SimulationError> {
        while self.now < end {
            self.step()?;
        }
        Ok(())
    }

    /// Runs to the configured end clock.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        self.run_until(self.config.end_clock)
    }

    /// Processes one tick.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        self.now += 1;
        let now = self.now;
        let max_ttl = self.config.protocol.max_ttl_ticks();

        if now == self.config.protocol.building_step + 1 {
            self.load_topology()?;
        }

        if now % max_ttl == 0 {
            self.assign_roles();
        }

        if now >= self.config.protocol.building_step && now + max_ttl < self.config.end_clock {
            for index in 0..self.processing_order.len() {
                let id = self.processing_order[index];
                self.tick_node(id)?;
            }
        }

        self.maybe_migrate()?;
        self.deliver_due()?;
        self.stats.ticks += 1;
        Ok(())
    }

    // ─── Per-node calls ───

    fn tick_node(&mut self, id: NodeIndex) -> Result<(), SimulationError> {
        let now = self.now;
        let mut outbox = Vec::new();
        {
            let (node, directory) = split_node(&mut self.nodes, id)
                .ok_or(SimulationError::UnknownNode { tick: now, node: id })?;
            let mut ctx = NodeContext {
                now,
                config: &self.config.protocol,
                roles: self.roles,
                rng: &mut self.rng,
                directory: &directory,
                outbox: &mut outbox,
                stats: &mut self.stats.dissemination,
            };
            on_tick(node, &mut ctx)?;
        }
        self.enqueue_all(outbox);
        Ok(())
    }

    fn deliver(&mut self, to: NodeIndex, delivery: Delivery) -> Result<(), SimulationError> {
        let now = self.now;
        let mut outbox = Vec::new();
        {
            let (node, directory) = split_node(&mut self.nodes, to)
                .ok_or(SimulationError::UnknownNode { tick: now, node: to })?;
            let mut ctx = NodeContext {
                now,
                config: &self.config.protocol,
                roles: self.roles,
                rng: &mut self.rng,
                directory: &directory,
                outbox: &mut outbox,
                stats: &mut self.stats.dissemination,
            };
            on_message(node, &mut ctx, delivery.from, delivery.message)?;
        }
        self.stats.events_processed += 1;
        self.enqueue_all(outbox);
        Ok(())
    }

    fn deliver_due(&mut self) -> Result<(), SimulationError> {
        while let Some(entry) = self.event_queue.first_entry() {
            if entry.key().time > self.now {
                break;
            }
            let (key, delivery) = entry.remove_entry();
            self.deliver(key.node_index, delivery)?;
        }
        Ok(())
    }

    // ─── Event queue ───

    fn enqueue(&mut self, entry: OutboxEntry) {
        let key = EventKey::new(&entry, self.sequence);
        self.sequence += 1;
        self.stats.messages_scheduled += 1;
        self.stats.messages_by_priority[key.priority as usize] += 1;
        self.event_queue.insert(
            key,
            Delivery {
                from: entry.from,
                message: entry.message,
            },
        );
    }

    fn enqueue_all(&mut self, outbox: Vec<OutboxEntry>) {
        for entry in outbox {
            self.enqueue(entry);
        }
    }

    // ─── Epoch roles ───

    fn assign_roles(&mut self) {
        let now = self.now;
        let max_ttl = self.config.protocol.max_ttl_ticks();
        if now <= self.config.execution_step || now + max_ttl >= self.config.end_clock {
            self.roles = EpochRoles::default();
            return;
        }
        match select_roles(&self.nodes, &mut self.rng) {
            Some(roles) => {
                debug!(
                    tick = now,
                    applicant = ?roles.applicant,
                    holder = ?roles.holder,
                    "Selected epoch roles"
                );
                self.roles = roles;
            }
            None => {
                warn!(
                    tick = now,
                    active = self.active_count(),
                    "Fewer than two active nodes, epoch has no roles"
                );
                self.stats.epochs_without_roles += 1;
                self.roles = EpochRoles::default();
            }
        }
    }

    // ─── Topology ───

    fn load_topology(&mut self) -> Result<(), SimulationError> {
        let edges = match &self.config.topology {
            TopologySource::Empty => {
                debug!(tick = self.now, "No initial topology");
                return Ok(());
            }
            TopologySource::Edges(list) => list.clone(),
            TopologySource::Random {
                min_degree,
                max_degree,
            } => EdgeList::random(
                self.config.num_nodes,
                *min_degree,
                *max_degree,
                self.rng.gen(),
            ),
        };

        let now = self.now;
        let total = self.nodes.len();
        let mut loaded = 0;
        let mut skipped = 0;
        for &(src, dst) in edges.edges() {
            if src as usize >= total {
                skipped += 1;
                continue;
            }
            if dst as usize >= total {
                return Err(SimulationError::UnknownDestination { tick: now, src, dst });
            }
            if src == dst
                || !self.nodes[src as usize].status().is_active()
                || !self.nodes[dst as usize].status().is_active()
            {
                continue;
            }
            match self.nodes[src as usize].insert_neighbor(dst) {
                Ok(()) => {}
                Err(NeighborError::CapacityExceeded { capacity }) => {
                    return Err(NodeError::NeighborCapacity {
                        tick: now,
                        node: src,
                        peer: dst,
                        capacity,
                    }
                    .into())
                }
                Err(_) => return Err(SimulationError::DuplicateEdge { tick: now, src, dst }),
            }
            self.enqueue(OutboxEntry {
                deliver_at: now + FLIGHT_TIME,
                from: src,
                to: dst,
                message: Message::Link,
            });
            self.stats.dissemination.links_sent += 1;
            loaded += 1;
        }
        self.stats.topology_edges_loaded += loaded;

        info!(
            tick = now,
            edges = edges.len(),
            loaded,
            skipped,
            active = self.active_count(),
            "Loaded initial topology"
        );
        Ok(())
    }

    // ─── Migration ───

    fn maybe_migrate(&mut self) -> Result<(), SimulationError> {
        let Some(interval) = self.config.migration_interval else {
            return Ok(());
        };
        if self.config.num_lps < 2 || interval == 0 || self.now % interval != 0 {
            return Ok(());
        }
        let id = self.rng.gen_range(0..self.config.num_nodes);
        let lp = self.rng.gen_range(0..self.config.num_lps);
        self.migrate_node(id, lp)
    }

    /// Moves node `id` to logical process `lp` through an export/import of
    /// its neighbor state.
    pub fn migrate_node(&mut self, id: NodeIndex, lp: u32) -> Result<(), SimulationError> {
        let now = self.now;
        if lp >= self.config.num_lps {
            return Err(SimulationError::UnknownLp { tick: now, lp });
        }
        let node = self
            .nodes
            .get_mut(id as usize)
            .ok_or(SimulationError::UnknownNode { tick: now, node: id })?;
        let payload = node.export_migration().map_err(|source| NodeError::Migration {
            tick: now,
            node: id,
            source,
        })?;
        let from_lp = node.lp();
        node.import_migration(lp, &payload);
        self.stats.migrations += 1;
        self.rebuild_processing_order();

        debug!(
            tick = now,
            node = id,
            from_lp,
            to_lp = lp,
            records = payload.len(),
            "Migrated node"
        );
        Ok(())
    }

    fn rebuild_processing_order(&mut self) {
        let mut order: Vec<(u32, NodeIndex)> =
            self.nodes.iter().map(|node| (node.lp(), node.id())).collect();
        order.sort_unstable();
        self.processing_order = order.into_iter().map(|(_, id)| id).collect();
    }
}
