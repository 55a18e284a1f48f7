//! Joining, leaving and rewiring.
//!
//! Every tick after the first epoch each node draws once from `[0, 10000)`.
//! Inactive nodes come back with probability 1%; active ones leave with the
//! probability that keeps the active share at the configured target.

use crate::config::ProtocolConfig;
use crate::context::NodeContext;
use crate::error::{NeighborError, NodeError};
use crate::state::NodeState;
use gossipsim_types::{Message, NodeStatus};
use rand::Rng;
use tracing::{debug, warn};

const CHURN_SCALE: u32 = 10_000;

/// Activation threshold out of [`CHURN_SCALE`].
const ACTIVATION_BASE: u32 = 100;

/// Candidate draws allowed per wanted connection before attachment gives up.
const ATTEMPTS_PER_CONNECTION: u32 = 64;

/// Deactivation threshold that balances activation at rate `base`.
///
/// With an active target of `p` percent the ratio of active to inactive
/// nodes is `p / (100 - p)`, so leaving must be that many times rarer than
/// joining.
pub fn deactivation_threshold(config: &ProtocolConfig, base: f64) -> f64 {
    let target = f64::from(config.active_target_percent);
    let ratio = target / (100.0 - target);
    base / ratio - config.hierarchy.deactivation_offset()
}

/// Connects `node` to a random set of active peers.
///
/// Returns how many links were created. The advertised degree is set to
/// the number of connections attempted, not the number created.
pub fn attach_node(node: &mut NodeState, ctx: &mut NodeContext<'_>) -> Result<u32, NodeError> {
    let connections = ctx
        .rng
        .gen_range(ctx.config.attach_min..=ctx.config.attach_max);
    let total = ctx.directory.total_nodes() as u32;
    let budget = connections * ATTEMPTS_PER_CONNECTION;

    let mut added = 0;
    let mut attempts = 0;
    while added < connections && total > 1 {
        if attempts == budget {
            warn!(
                tick = ctx.now,
                node = node.id(),
                added,
                connections,
                "Attachment budget exhausted"
            );
            break;
        }
        attempts += 1;

        let candidate = ctx.rng.gen_range(0..total);
        if candidate == node.id() {
            continue;
        }
        match ctx.directory.peer(candidate) {
            Some(view) if view.status.is_active() => {}
            _ => continue,
        }
        let peer = match ctx.config.hierarchy.redirect_attachment(
            ctx.rng,
            ctx.now,
            ctx.config.stabilization_tick,
        ) {
            Some(core) if core != node.id() => core,
            _ => candidate,
        };

        match node.insert_neighbor(peer) {
            Ok(()) => {
                ctx.send(node.id(), peer, Message::Link)?;
                added += 1;
            }
            Err(NeighborError::CapacityExceeded { capacity }) => {
                return Err(NodeError::NeighborCapacity {
                    tick: ctx.now,
                    node: node.id(),
                    peer,
                    capacity,
                })
            }
            Err(_) => {}
        }
    }

    node.set_advertised_degree(connections);
    debug!(tick = ctx.now, node = node.id(), added, connections, "Attached");
    Ok(added)
}

/// Drops every link of `node`, notifying both sides.
pub fn detach_node(node: &mut NodeState, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
    let id = node.id();
    for peer in node.drain_neighbors() {
        ctx.send(id, peer, Message::Unlink)?;
        ctx.send(peer, id, Message::Unlink)?;
    }
    node.set_advertised_degree(0);
    Ok(())
}

/// Per-tick join/leave decision.
pub fn apply_churn(node: &mut NodeState, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
    if ctx.now <= ctx.config.max_ttl_ticks() {
        return Ok(());
    }

    let draw = ctx.rng.gen_range(0..CHURN_SCALE);
    let status = node.status();

    if status == NodeStatus::Inactive {
        if draw < ACTIVATION_BASE {
            node.set_status(NodeStatus::Active);
            ctx.stats.activations += 1;
            attach_node(node, ctx)?;
        }
    } else if status.is_churn_eligible()
        && !ctx.config.hierarchy.is_core(node.id())
        && f64::from(draw) < deactivation_threshold(ctx.config, f64::from(ACTIVATION_BASE))
    {
        node.set_status(NodeStatus::Inactive);
        ctx.stats.deactivations += 1;
        detach_node(node, ctx)?;
    }
    Ok(())
}
