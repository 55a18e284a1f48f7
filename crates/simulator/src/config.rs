//! Simulator configuration.

use gossipsim_node::ProtocolConfig;
use gossipsim_simulation::{EdgeList, SimulationConfig, SimulationError, TopologySource};
use gossipsim_types::Tick;
use std::path::PathBuf;

/// Where the simulator gets its initial topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyInput {
    /// Edge-list file, read when the simulator is built.
    File(PathBuf),
    Random { min_degree: u32, max_degree: u32 },
    Empty,
}

/// Configuration for a simulator run.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub num_nodes: u32,
    pub num_lps: u32,
    pub seed: u64,
    pub protocol: ProtocolConfig,
    pub end_clock: Tick,
    pub execution_step: Tick,
    pub topology: TopologyInput,
    pub migration_interval: Option<Tick>,
    /// Log a progress line every this many ticks.
    pub progress_interval: Tick,
}

impl SimulatorConfig {
    pub fn new(num_nodes: u32, protocol: ProtocolConfig) -> Self {
        Self {
            num_nodes,
            num_lps: 1,
            seed: 12345,
            protocol,
            end_clock: 2000,
            execution_step: 20,
            topology: TopologyInput::Random {
                min_degree: 5,
                max_degree: 10,
            },
            migration_interval: None,
            progress_interval: 500,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_lps(mut self, num_lps: u32) -> Self {
        self.num_lps = num_lps;
        self
    }

    pub fn with_end_clock(mut self, end_clock: Tick) -> Self {
        self.end_clock = end_clock;
        self
    }

    pub fn with_execution_step(mut self, execution_step: Tick) -> Self {
        self.execution_step = execution_step;
        self
    }

    pub fn with_topology(mut self, topology: TopologyInput) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_migration_interval(mut self, interval: Option<Tick>) -> Self {
        self.migration_interval = interval;
        self
    }

    pub fn with_progress_interval(mut self, interval: Tick) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Resolves the topology input and builds the runner configuration.
    pub fn simulation_config(&self) -> Result<SimulationConfig, SimulationError> {
        let topology = match &self.topology {
            TopologyInput::File(path) => TopologySource::Edges(EdgeList::from_file(path)?),
            TopologyInput::Random {
                min_degree,
                max_degree,
            } => TopologySource::Random {
                min_degree: *min_degree,
                max_degree: *max_degree,
            },
            TopologyInput::Empty => TopologySource::Empty,
        };
        Ok(SimulationConfig {
            num_nodes: self.num_nodes,
            num_lps: self.num_lps,
            protocol: self.protocol.clone(),
            end_clock: self.end_clock,
            execution_step: self.execution_step,
            topology,
            migration_interval: self.migration_interval,
        })
    }
}
