//! End-of-run summary.

use gossipsim_simulation::SimulationRunner;
use serde::Serialize;
use std::time::Duration;

/// Results of a simulator run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub mode: String,
    pub seed: u64,
    pub nodes: u32,
    pub ticks: u64,

    pub epochs: u64,
    pub deliveries: u64,
    pub delivery_rate: f64,
    pub mean_delivery_ticks: f64,
    pub recoveries: u64,
    pub epochs_without_roles: u64,

    pub requests_sent: u64,
    pub requests_received: u64,
    pub links_sent: u64,
    pub unlinks_sent: u64,
    pub events_processed: u64,

    pub activations: u64,
    pub deactivations: u64,
    pub active_nodes: usize,
    pub mean_active_fraction: f64,
    pub mean_degree: f64,
    pub migrations: u64,

    pub wall_duration_secs: f64,
}

impl SimulationReport {
    pub fn from_runner(runner: &SimulationRunner, seed: u64, wall_duration: Duration) -> Self {
        let stats = runner.stats();
        let d = &stats.dissemination;
        let config = runner.config();
        Self {
            mode: config.protocol.mode.name().to_string(),
            seed,
            nodes: config.num_nodes,
            ticks: stats.ticks,
            epochs: d.epochs,
            deliveries: d.deliveries,
            delivery_rate: d.delivery_rate(),
            mean_delivery_ticks: d.mean_delivery_ticks(),
            recoveries: d.recoveries,
            epochs_without_roles: stats.epochs_without_roles,
            requests_sent: d.requests_sent,
            requests_received: d.requests_received,
            links_sent: d.links_sent,
            unlinks_sent: d.unlinks_sent,
            events_processed: stats.events_processed,
            activations: d.activations,
            deactivations: d.deactivations,
            active_nodes: runner.active_count(),
            mean_active_fraction: d.mean_active_fraction(),
            mean_degree: d.mean_boundary_degree(),
            migrations: stats.migrations,
            wall_duration_secs: wall_duration.as_secs_f64(),
        }
    }

    /// Requests sent per completed round.
    pub fn requests_per_epoch(&self) -> f64 {
        if self.epochs == 0 {
            0.0
        } else {
            self.requests_sent as f64 / self.epochs as f64
        }
    }

    pub fn print_summary(&self) {
        println!("\n═══════════════════════════════════════════");
        println!("       GOSSIP SIMULATION REPORT            ");
        println!("═══════════════════════════════════════════");
        println!();
        println!("Run:");
        println!("  Mode:       {}", self.mode);
        println!("  Seed:       {}", self.seed);
        println!("  Nodes:      {}", self.nodes);
        println!("  Ticks:      {}", self.ticks);
        println!();
        println!("Rounds:");
        println!("  Epochs:     {}", self.epochs);
        println!("  Delivered:  {} ({:.1}%)", self.deliveries, self.delivery_rate * 100.0);
        println!("  Latency:    {:.2} ticks (mean)", self.mean_delivery_ticks);
        println!("  Recoveries: {}", self.recoveries);
        println!("  No roles:   {}", self.epochs_without_roles);
        println!();
        println!("Messages:");
        println!("  Requests:   {} sent, {} received", self.requests_sent, self.requests_received);
        println!("  Per epoch:  {:.1}", self.requests_per_epoch());
        println!("  Links:      {}", self.links_sent);
        println!("  Unlinks:    {}", self.unlinks_sent);
        println!("  Delivered:  {}", self.events_processed);
        println!();
        println!("Churn:");
        println!("  Joined:     {}", self.activations);
        println!("  Left:       {}", self.deactivations);
        println!("  Active:     {} at end, {:.1}% mean", self.active_nodes, self.mean_active_fraction * 100.0);
        println!("  Degree:     {:.2} (mean advertised)", self.mean_degree);
        println!("  Migrations: {}", self.migrations);
        println!();
        println!("Duration: {:.2}s", self.wall_duration_secs);
        println!("═══════════════════════════════════════════\n");
    }
}
