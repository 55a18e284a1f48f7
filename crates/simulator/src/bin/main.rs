//! Gossip simulator CLI
//!
//! Runs a deterministic gossip dissemination simulation under churn. Every
//! protocol parameter can also be given through its environment variable.
//!
//! # Example
//!
//! ```bash
//! # Dandelion with a 5-hop stem over 10k nodes
//! gossipsim --nodes 10000 --dissemination 4 --stem-steps 5 --seed 42
//!
//! # Same run configured from the environment, reading a topology file
//! DISSEMINATION=4 DANDELION_STEPS_STEM_PHASE=5 gossipsim --topology graph.dot
//! ```

use clap::Parser;
use gossipsim_node::{DisseminationMode, HierarchyMode, ModeParameters, ProtocolConfig};
use gossipsim_simulator::{write_report, Simulator, SimulatorConfig, SimulatorError, TopologyInput};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Gossip dissemination simulator
///
/// Single-threaded and reproducible when the same seed is used.
#[derive(Parser, Debug)]
#[command(name = "gossipsim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of simulated nodes
    #[arg(short = 'n', long, env = "NODES", default_value = "1000")]
    nodes: u32,

    /// Number of logical processes
    #[arg(long, env = "LPS", default_value = "1")]
    lps: u32,

    /// Last simulated tick
    #[arg(short = 'e', long, env = "END_CLOCK", default_value = "2000")]
    end_clock: u64,

    /// Epoch length and initial request TTL
    #[arg(long, env = "MAX_TTL", default_value = "20")]
    max_ttl: u16,

    /// Dissemination mode: 0 broadcast, 1 fixed probability, 2 degree dependent,
    /// 3 fixed fanout, 4 Dandelion, 5 Dandelion++
    #[arg(short = 'd', long, env = "DISSEMINATION", default_value = "0")]
    dissemination: u32,

    /// Broadcast relay probability, in percent
    #[arg(long, env = "BROADCAST_PROB_THRESHOLD", default_value = "100")]
    broadcast_threshold: f64,

    /// Per-neighbor probability for fixed-probability gossip, in percent
    #[arg(long, env = "FIXED_PROB_THRESHOLD", default_value = "50")]
    fixed_threshold: f64,

    /// Degree-dependent function: 1 for 1/deg^c, 2 for 1/ln(c*deg)
    #[arg(long, env = "PROBABILITY_FUNCTION", default_value = "1")]
    probability_function: u32,

    /// Coefficient c of the degree-dependent function
    #[arg(long, env = "FUNCTION_COEFFICIENT", default_value = "1.0")]
    function_coefficient: f64,

    /// Stem length for the Dandelion family
    #[arg(long, env = "DANDELION_STEPS_STEM_PHASE", default_value = "5")]
    stem_steps: u32,

    /// Steady-state percentage of active nodes
    #[arg(long, env = "ACTIVE_PERC", default_value = "50")]
    active_perc: u32,

    /// Tick of the initial deactivation pass
    #[arg(long, env = "BUILDING_STEP", default_value = "1")]
    building_step: u64,

    /// Roles are assigned only after this tick
    #[arg(long, env = "EXECUTION_STEP", default_value = "20")]
    execution_step: u64,

    /// Rounds are counted from this tick on
    #[arg(long, env = "STABILIZATION_TICK", default_value = "400")]
    stabilization_tick: u64,

    /// Core size for hierarchy mode. Flat when omitted.
    #[arg(long, env = "HIERARCHY_CORE")]
    hierarchy_core: Option<u32>,

    /// Edge-list file with the initial topology. A random graph is used when omitted.
    #[arg(short = 't', long, env = "TOPOLOGY")]
    topology: Option<PathBuf>,

    /// Start without any initial edges
    #[arg(long, conflicts_with = "topology")]
    empty_topology: bool,

    /// Migrate one random node every this many ticks
    #[arg(long, env = "MIGRATION_INTERVAL")]
    migration_interval: Option<u64>,

    /// Random seed for reproducible results. When omitted, a random seed is used.
    #[arg(long, env = "SEED")]
    seed: Option<u64>,

    /// Ticks between progress log lines
    #[arg(long, default_value = "500")]
    progress_interval: u64,

    /// Write the report as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the final topology as an edge list to this path
    #[arg(long)]
    dump_topology: Option<PathBuf>,
}

impl Args {
    fn protocol(&self) -> Result<ProtocolConfig, SimulatorError> {
        let params = ModeParameters {
            broadcast_threshold: self.broadcast_threshold,
            fixed_threshold: self.fixed_threshold,
            probability_function: self.probability_function,
            function_coefficient: self.function_coefficient,
            stem_steps: self.stem_steps,
        };
        let mode = DisseminationMode::from_id(self.dissemination, &params)
            .map_err(gossipsim_simulation::SimulationError::from)?;
        let hierarchy = match self.hierarchy_core {
            Some(core_size) => HierarchyMode::Core { core_size },
            None => HierarchyMode::Flat,
        };
        Ok(ProtocolConfig::new(mode)
            .with_max_ttl(self.max_ttl)
            .with_active_target(self.active_perc)
            .with_building_step(self.building_step)
            .with_stabilization_tick(self.stabilization_tick)
            .with_hierarchy(hierarchy))
    }

    fn topology(&self) -> TopologyInput {
        match (&self.topology, self.empty_topology) {
            (Some(path), _) => TopologyInput::File(path.clone()),
            (None, true) => TopologyInput::Empty,
            (None, false) => TopologyInput::Random {
                min_degree: 5,
                max_degree: 10,
            },
        }
    }
}

fn run(args: Args) -> Result<(), SimulatorError> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let protocol = args.protocol()?;

    info!(
        nodes = args.nodes,
        lps = args.lps,
        end_clock = args.end_clock,
        mode = protocol.mode.name(),
        max_ttl = protocol.max_ttl,
        active_perc = protocol.active_target_percent,
        seed,
        "Starting simulation"
    );

    let config = SimulatorConfig::new(args.nodes, protocol)
        .with_seed(seed)
        .with_lps(args.lps)
        .with_end_clock(args.end_clock)
        .with_execution_step(args.execution_step)
        .with_topology(args.topology())
        .with_migration_interval(args.migration_interval)
        .with_progress_interval(args.progress_interval);

    let mut simulator = Simulator::new(config)?;
    let report = simulator.run()?;
    report.print_summary();

    if let Some(path) = &args.json {
        write_report(&report, path)?;
        info!(path = %path.display(), "Wrote report");
    }
    if let Some(path) = &args.dump_topology {
        simulator.write_topology(path)?;
        info!(path = %path.display(), "Wrote topology");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("warn,gossipsim_simulator=info,gossipsim_simulation=info")
        }))
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Simulation failed");
            ExitCode::FAILURE
        }
    }
}
