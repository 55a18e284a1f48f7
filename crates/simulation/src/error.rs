//! Fatal simulation errors.

use crate::topology::TopologyError;
use gossipsim_node::{ConfigError, NodeError};
use gossipsim_types::{NodeIndex, Tick};

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("topology: {0}")]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("tick {tick}: topology edge {src}--{dst} names a missing node")]
    UnknownDestination {
        tick: Tick,
        src: NodeIndex,
        dst: NodeIndex,
    },

    #[error("tick {tick}: topology edge {src}--{dst} appears twice")]
    DuplicateEdge {
        tick: Tick,
        src: NodeIndex,
        dst: NodeIndex,
    },

    #[error("tick {tick}: node {node} does not exist")]
    UnknownNode { tick: Tick, node: NodeIndex },

    #[error("tick {tick}: logical process {lp} does not exist")]
    UnknownLp { tick: Tick, lp: u32 },
}
