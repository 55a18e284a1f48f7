//! Simulator wrapper around the deterministic runner.

use crate::config::SimulatorConfig;
use crate::report::SimulationReport;
use gossipsim_simulation::{SimulationError, SimulationRunner};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runs a configured simulation with progress logging.
pub struct Simulator {
    runner: SimulationRunner,
    config: SimulatorConfig,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        let runner = SimulationRunner::new(config.simulation_config()?, config.seed)?;
        Ok(Self { runner, config })
    }

    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    /// Runs to the end clock and builds the report.
    pub fn run(&mut self) -> Result<SimulationReport, SimulatorError> {
        let started = Instant::now();
        let end = self.config.end_clock;

        while self.runner.now() < end {
            let next = (self.runner.now() + self.config.progress_interval).min(end);
            self.runner.run_until(next)?;

            let d = &self.runner.stats().dissemination;
            info!(
                tick = self.runner.now(),
                active = self.runner.active_count(),
                epochs = d.epochs,
                deliveries = d.deliveries,
                pending = self.runner.pending_deliveries(),
                "Progress"
            );
        }

        let report = SimulationReport::from_runner(&self.runner, self.config.seed, started.elapsed());
        info!(
            epochs = report.epochs,
            deliveries = report.deliveries,
            delivery_rate = report.delivery_rate,
            "Simulation complete"
        );
        Ok(report)
    }

    /// Writes the current neighbor sets as an edge list.
    pub fn write_topology(&self, path: &Path) -> Result<(), SimulatorError> {
        std::fs::write(path, self.runner.snapshot_edges().to_string()).map_err(|source| {
            SimulatorError::Io {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

/// Writes `report` as pretty JSON.
pub fn write_report(report: &SimulationReport, path: &Path) -> Result<(), SimulatorError> {
    let contents = serde_json::to_string_pretty(report)?;
    std::fs::write(path, contents).map_err(|source| SimulatorError::Io {
        path: path.to_path_buf(),
        source,
    })
}
