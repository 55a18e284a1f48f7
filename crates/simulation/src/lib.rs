//! Deterministic simulation of gossip dissemination under churn.
//!
//! The runner owns every [`NodeState`](gossipsim_node::NodeState), a single
//! seeded random stream and the delivery queue. Node logic from
//! `gossipsim-node` runs against a split view of the node table, so a node
//! can only mutate itself and must message its peers.
//!
//! ```text
//! ┌────────────────────────── SimulationRunner ──────────────────────────┐
//! │  tick ─▶ topology load ─▶ roles ─▶ on_tick(node) ∀ nodes ─▶ deliver  │
//! │                                         │                    ▲       │
//! │                                  OutboxEntry ─▶ event queue ─┘       │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use gossipsim_simulation::{SimulationConfig, SimulationRunner};
//!
//! let config = SimulationConfig {
//!     num_nodes: 50,
//!     end_clock: 100,
//!     ..Default::default()
//! };
//! let mut runner = SimulationRunner::new(config, 42).unwrap();
//! runner.run().unwrap();
//! assert_eq!(runner.now(), 100);
//! ```

mod config;
mod directory;
mod error;
mod event_queue;
mod roles;
mod runner;
mod topology;

pub use config::{SimulationConfig, TopologySource};
pub use error::SimulationError;
pub use event_queue::{Delivery, EventKey};
pub use roles::select_roles;
pub use runner::{SimulationRunner, SimulationStats};
pub use topology::{EdgeList, TopologyError};
