//! Run-level configuration.

use crate::topology::EdgeList;
use gossipsim_node::{ConfigError, HierarchyMode, ProtocolConfig};
use gossipsim_types::Tick;

/// Where the initial topology comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologySource {
    /// No initial edges; nodes attach on their own after the first epoch.
    Empty,
    Edges(EdgeList),
    /// [`EdgeList::random`] seeded from the run's random stream.
    Random { min_degree: u32, max_degree: u32 },
}

/// Configuration of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub num_nodes: u32,
    /// Logical processes. Nodes are processed LP by LP.
    pub num_lps: u32,
    pub protocol: ProtocolConfig,
    /// Last tick of the run.
    pub end_clock: Tick,
    /// Roles are only chosen after this tick.
    pub execution_step: Tick,
    pub topology: TopologySource,
    /// Move one random node to a random LP every this many ticks.
    pub migration_interval: Option<Tick>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_nodes: 1000,
            num_lps: 1,
            protocol: ProtocolConfig::default(),
            end_clock: 2000,
            execution_step: 20,
            topology: TopologySource::Random {
                min_degree: 5,
                max_degree: 10,
            },
            migration_interval: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.protocol.validate()?;
        check_at_least("num_nodes", u64::from(self.num_nodes), 1)?;
        check_at_least("num_lps", u64::from(self.num_lps), 1)?;
        check_at_least("building_step", self.protocol.building_step, 1)?;
        check_at_least(
            "end_clock",
            self.end_clock,
            self.protocol.max_ttl_ticks() + 1,
        )?;
        if let TopologySource::Random {
            min_degree,
            max_degree,
        } = self.topology
        {
            check_at_least("max_degree", u64::from(max_degree), u64::from(min_degree))?;
        }
        if let HierarchyMode::Core { core_size } = self.protocol.hierarchy {
            if core_size == 0 || core_size > self.num_nodes {
                return Err(ConfigError::OutOfRange {
                    name: "core_size",
                    value: f64::from(core_size),
                    min: 1.0,
                    max: f64::from(self.num_nodes),
                });
            }
        }
        Ok(())
    }
}

fn check_at_least(name: &'static str, value: u64, min: u64) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::OutOfRange {
            name,
            value: value as f64,
            min: min as f64,
            max: f64::INFINITY,
        });
    }
    Ok(())
}
