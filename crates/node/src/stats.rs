//! Counters updated by node logic during a run.

use gossipsim_types::Tick;

/// Dissemination and churn counters, shared by every node in a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisseminationStats {
    /// Requests handed to an inbound handler.
    pub requests_received: u64,
    /// Requests scheduled for delivery.
    pub requests_sent: u64,
    pub links_sent: u64,
    pub unlinks_sent: u64,
    /// Rounds started after stabilization.
    pub epochs: u64,
    /// Rounds whose request reached the holder.
    pub deliveries: u64,
    /// Sum of the epoch offsets at which holders received the request.
    pub delivery_ticks_total: Tick,
    pub recoveries: u64,
    pub activations: u64,
    pub deactivations: u64,
    /// Advertised degrees summed over every node at every epoch boundary.
    pub boundary_degree_total: u64,
    /// Active nodes summed over every epoch boundary.
    pub boundary_active_total: u64,
    /// Number of (node, epoch boundary) observations.
    pub boundary_samples: u64,
}

impl DisseminationStats {
    /// Fraction of rounds that reached their holder.
    pub fn delivery_rate(&self) -> f64 {
        if self.epochs == 0 {
            0.0
        } else {
            self.deliveries as f64 / self.epochs as f64
        }
    }

    /// Mean epoch offset at which the holder received the request.
    pub fn mean_delivery_ticks(&self) -> f64 {
        if self.deliveries == 0 {
            0.0
        } else {
            self.delivery_ticks_total as f64 / self.deliveries as f64
        }
    }

    /// Mean advertised degree of active nodes at epoch boundaries.
    pub fn mean_boundary_degree(&self) -> f64 {
        if self.boundary_active_total == 0 {
            0.0
        } else {
            self.boundary_degree_total as f64 / self.boundary_active_total as f64
        }
    }

    /// Mean share of active nodes at epoch boundaries.
    pub fn mean_active_fraction(&self) -> f64 {
        if self.boundary_samples == 0 {
            0.0
        } else {
            self.boundary_active_total as f64 / self.boundary_samples as f64
        }
    }
}
