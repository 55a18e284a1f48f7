//! Seams between simulated nodes and the runner that drives them.
//!
//! - [`OutboxEntry`]: a message a node wants delivered later
//! - [`EventPriority`]: ordering of deliveries that share a tick
//! - [`Scheduler`]: where nodes push their outgoing messages
//! - [`NodeDirectory`]: read-only lookup of other nodes
//!
//! # Architecture
//!
//! ```text
//! runner ──tick──▶ node logic ──OutboxEntry──▶ Scheduler (event queue)
//!                     │                              │
//!                     └──peer(id)──▶ NodeDirectory    └──deliver_at──▶ node logic
//! ```
//!
//! Node logic never touches another node's state. Everything it learns
//! about peers goes through [`NodeDirectory`], everything it tells them goes
//! through [`Scheduler`].

mod outbox;
mod traits;

pub use outbox::{EventPriority, OutboxEntry};
pub use traits::{NodeDirectory, PeerView, Scheduler};
