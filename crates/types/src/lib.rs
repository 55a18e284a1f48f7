//! Shared vocabulary of the gossip simulator.
//!
//! Everything here is plain data: identifiers, the per-node status and
//! loop-back marker, the wire messages nodes exchange, and the fixed sizes
//! the transport works with. Behavior lives in `gossipsim-node`.

mod message;
mod status;

pub use message::{Message, MigrationError, MigrationPayload, MigrationRecord, RequestMsg};
pub use status::{NodeStatus, ReceivedMarker};

/// Index of a simulated node. Ids are dense in `[0, total_nodes)`.
pub type NodeIndex = u32;

/// Discrete simulated time step.
pub type Tick = u64;

/// Upper bound on neighbor-set entries, and on records in a migration payload.
pub const MAX_DYNAMIC_RECORDS: usize = 250;

/// Transport buffer size in bytes. Larger messages cannot be scheduled.
pub const BUFFER_SIZE: usize = 1024;

/// Fixed delay between scheduling a message and its delivery.
pub const FLIGHT_TIME: Tick = 1;
