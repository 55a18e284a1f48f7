//! Gossip dissemination simulator.
//!
//! Wraps `gossipsim-simulation` with a builder-style configuration,
//! progress logging and an end-of-run report.
//!
//! # Example
//!
//! ```ignore
//! use gossipsim_node::{DisseminationMode, ProtocolConfig};
//! use gossipsim_simulator::{Simulator, SimulatorConfig};
//!
//! let protocol = ProtocolConfig::new(DisseminationMode::Dandelion { stem_steps: 5 });
//! let config = SimulatorConfig::new(10_000, protocol)
//!     .with_end_clock(5000)
//!     .with_seed(42);
//!
//! let mut simulator = Simulator::new(config)?;
//! let report = simulator.run()?;
//! report.print_summary();
//! ```

mod config;
mod report;
mod runner;

pub use config::{SimulatorConfig, TopologyInput};
pub use report::SimulationReport;
pub use runner::{write_report, Simulator, SimulatorError};
