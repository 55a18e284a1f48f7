//! Per-node logic of the gossip simulator.
//!
//! A node is a [`NodeState`] plus the free functions that act on it. The
//! runner calls [`on_tick`] once per tick and [`on_message`] for each
//! delivery, passing a [`NodeContext`] with the clock, the shared random
//! stream, a read-only [`NodeDirectory`](gossipsim_core::NodeDirectory) and a
//! [`Scheduler`](gossipsim_core::Scheduler) for outgoing messages.
//!
//! | Module | Concern |
//! |--------|---------|
//! | [`neighbors`] | bounded ordered neighbor set |
//! | [`churn`] | attach, detach, join/leave decisions |
//! | [`dissemination`] | who receives a relayed request |
//! | [`epoch`] | per-tick control and inbound handling |

mod config;
mod context;
mod error;
mod state;
mod stats;

pub mod churn;
pub mod dissemination;
pub mod epoch;
pub mod neighbors;

#[cfg(test)]
mod testing;

pub use config::{
    ConfigError, DisseminationMode, HierarchyMode, ModeParameters, ProbabilityFunction,
    ProtocolConfig,
};
pub use context::{EpochRoles, NodeContext};
pub use epoch::{on_message, on_tick};
pub use error::{NeighborError, NodeError};
pub use neighbors::NeighborSet;
pub use state::{DegreeCache, NodeState};
pub use stats::DisseminationStats;
