//! Per-tick control and inbound message handling.
//!
//! Time is divided into epochs of `max_ttl` ticks. At each boundary every
//! node resets its per-epoch state and the epoch's applicant starts a new
//! round; the round ends when the holder receives the request or the TTL
//! runs out.
//!
//! ```text
//!   building_step      max_ttl        k·max_ttl          (k+1)·max_ttl
//!        │                │               │                     │
//!   deactivate ─ load ─ sync degree ─ boundary: reset, originate ─ relays ─ boundary ...
//!                                     churn and recovery every tick after max_ttl
//! ```

use crate::churn::{apply_churn, attach_node};
use crate::config::DisseminationMode;
use crate::context::NodeContext;
use crate::dissemination::{forward_to_neighbors, node_is_stem};
use crate::error::{NeighborError, NodeError};
use crate::state::NodeState;
use gossipsim_types::{Message, NodeIndex, NodeStatus, ReceivedMarker, RequestMsg, Tick};
use rand::Rng;
use tracing::{debug, trace};

/// Extra ticks a Dandelion node waits past the stem before recovering.
const DANDELION_RECOVERY_SLACK: Tick = 4;

/// Fixed recovery window for Dandelion++.
const DANDELION_PP_RECOVERY_WINDOW: Tick = 7;

/// Runs the per-tick control steps for one node.
pub fn on_tick(node: &mut NodeState, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
    let max_ttl = ctx.config.max_ttl_ticks();

    if ctx.now == ctx.config.building_step && !ctx.config.hierarchy.is_core(node.id()) {
        let draw = ctx.rng.gen_range(0..100);
        if draw >= ctx.config.active_target_percent {
            node.set_status(NodeStatus::Inactive);
        }
    }

    if ctx.now == max_ttl {
        node.sync_degree();
    }

    if node.status().is_active() && node.advertised_degree() == 0 && ctx.now > max_ttl {
        attach_node(node, ctx)?;
    }

    if ctx.now >= max_ttl && ctx.now % max_ttl == 0 {
        start_epoch(node, ctx)?;
    }

    apply_churn(node, ctx)?;

    if needs_recovery(node, ctx) {
        recover(node, ctx)?;
    }
    Ok(())
}

/// Epoch boundary: reset per-epoch state and, for the applicant, originate.
fn start_epoch(node: &mut NodeState, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
    ctx.stats.boundary_samples += 1;
    if node.status().is_active() {
        ctx.stats.boundary_active_total += 1;
        ctx.stats.boundary_degree_total += u64::from(node.advertised_degree());
        node.set_status(NodeStatus::Active);
    }
    node.set_received(ReceivedMarker::None);

    let id = node.id();
    if ctx.roles.is_applicant(id) {
        node.set_status(NodeStatus::Applicant);
    }
    if ctx.roles.is_holder(id) {
        node.set_status(NodeStatus::Holder);
    }

    if ctx.roles.is_applicant(id) && ctx.now > ctx.config.stabilization_tick {
        ctx.stats.epochs += 1;
        originate(node, ctx)?;
    }
    Ok(())
}

/// Starts the epoch's round from the applicant.
fn originate(node: &mut NodeState, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
    let max_ttl = ctx.config.max_ttl;
    let id = node.id();
    debug!(
        tick = ctx.now,
        applicant = id,
        holder = ?ctx.roles.holder,
        neighbors = node.neighbor_count(),
        "Originating round"
    );

    if ctx.config.mode.is_dandelion_family() {
        let request = RequestMsg {
            created_at: ctx.now,
            ttl: max_ttl.saturating_sub(1),
            id: ctx.now,
            creator: id,
        };
        forward_to_neighbors(node, ctx, request, id)?;
    } else {
        let request = RequestMsg {
            created_at: ctx.now,
            ttl: max_ttl,
            id: ctx.now,
            creator: id,
        };
        let peers: Vec<NodeIndex> = node.neighbors().iter().collect();
        for peer in peers {
            ctx.send_request(id, peer, request)?;
        }
    }
    node.set_received(ReceivedMarker::Timestamp(ctx.now));
    Ok(())
}

/// Whether a Dandelion-family node saw the request in its stem phase and
/// has not seen it come back in time.
pub fn needs_recovery(node: &NodeState, ctx: &NodeContext<'_>) -> bool {
    let Some(stem_steps) = ctx.config.mode.stem_steps() else {
        return false;
    };
    let Some(received) = node.received().timestamp() else {
        return false;
    };
    if ctx.now <= ctx.config.stabilization_tick
        || !node.status().is_active()
        || ctx.config.epoch_offset(received) > Tick::from(stem_steps)
    {
        return false;
    }

    let waited = ctx.now.saturating_sub(received);
    match ctx.config.mode {
        DisseminationMode::Dandelion { .. } => {
            waited > Tick::from(stem_steps) + DANDELION_RECOVERY_SLACK
        }
        DisseminationMode::DandelionPlusPlus { .. } => {
            waited > DANDELION_PP_RECOVERY_WINDOW && node_is_stem(node, ctx)
        }
        _ => false,
    }
}

/// Re-originates the request with the TTL left in this epoch.
fn recover(node: &mut NodeState, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
    let remaining = ctx.config.max_ttl_ticks() - ctx.epoch_offset();
    let id = node.id();
    debug!(tick = ctx.now, node = id, remaining, "Recovering stalled stem");
    ctx.stats.recoveries += 1;

    let request = RequestMsg {
        created_at: ctx.now,
        ttl: u16::try_from(remaining.saturating_sub(1)).unwrap_or(u16::MAX),
        id: ctx.now,
        creator: id,
    };
    forward_to_neighbors(node, ctx, request, id)?;
    node.set_received(ReceivedMarker::LoopbackConfirmed);
    Ok(())
}

/// Inbound dispatch for every message type.
pub fn on_message(
    node: &mut NodeState,
    ctx: &mut NodeContext<'_>,
    from: NodeIndex,
    message: Message,
) -> Result<(), NodeError> {
    match message {
        Message::Request(request) => on_request(node, ctx, from, request),
        Message::Link => on_link(node, ctx, from),
        Message::Unlink => {
            on_unlink(node, from);
            Ok(())
        }
        Message::Migration(payload) => {
            let lp = node.lp();
            node.import_migration(lp, &payload);
            Ok(())
        }
    }
}

fn on_request(
    node: &mut NodeState,
    ctx: &mut NodeContext<'_>,
    forwarder: NodeIndex,
    request: RequestMsg,
) -> Result<(), NodeError> {
    ctx.stats.requests_received += 1;
    let status = node.status();
    let offset = ctx.epoch_offset();
    let is_stem = node_is_stem(node, ctx);

    if status == NodeStatus::Holder {
        node.set_status(NodeStatus::HolderRelayed);
        ctx.stats.deliveries += 1;
        ctx.stats.delivery_ticks_total += offset;
        debug!(
            tick = ctx.now,
            holder = node.id(),
            creator = request.creator,
            latency = offset,
            "Request delivered"
        );
    } else {
        // The holder stays terminal once it has the request.
        let may_relay = status.is_active() && status != NodeStatus::HolderRelayed;
        let relays = match ctx.config.mode {
            _ if status == NodeStatus::Active => true,
            DisseminationMode::Dandelion { stem_steps } => {
                may_relay && offset <= Tick::from(stem_steps)
            }
            DisseminationMode::DandelionPlusPlus { .. } => may_relay && is_stem,
            _ => false,
        };
        if relays {
            node.set_status(NodeStatus::ActiveRelayed);
            let relayed = RequestMsg {
                created_at: request.created_at,
                ttl: request.ttl.saturating_sub(1),
                id: ctx.now,
                creator: request.creator,
            };
            let sent = forward_to_neighbors(node, ctx, relayed, forwarder)?;
            trace!(tick = ctx.now, node = node.id(), forwarder, sent, "Relayed request");
        }
    }

    match ctx.config.mode {
        DisseminationMode::Dandelion { stem_steps } => {
            update_marker(node, ctx.now, offset <= Tick::from(stem_steps));
        }
        DisseminationMode::DandelionPlusPlus { .. } if is_stem => {
            update_marker(node, ctx.now, true);
        }
        _ => {}
    }
    Ok(())
}

/// Records a stem-phase reception, or confirms the loop-back.
fn update_marker(node: &mut NodeState, now: Tick, in_stem: bool) {
    if !node.received().is_loopback_confirmed() && in_stem {
        node.set_received(ReceivedMarker::Timestamp(now));
    } else {
        node.set_received(ReceivedMarker::LoopbackConfirmed);
    }
}

fn on_link(node: &mut NodeState, ctx: &NodeContext<'_>, from: NodeIndex) -> Result<(), NodeError> {
    match node.insert_neighbor(from) {
        Ok(()) => Ok(()),
        Err(NeighborError::CapacityExceeded { capacity }) => Err(NodeError::NeighborCapacity {
            tick: ctx.now,
            node: node.id(),
            peer: from,
            capacity,
        }),
        Err(_) => {
            trace!(tick = ctx.now, node = node.id(), peer = from, "Duplicate link ignored");
            Ok(())
        }
    }
}

fn on_unlink(node: &mut NodeState, from: NodeIndex) {
    // Already gone when both sides detached in the same tick.
    let _ = node.remove_neighbor(from);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HierarchyMode, ProtocolConfig};
    use crate::context::EpochRoles;
    use crate::testing::Harness;
    use gossipsim_types::MAX_DYNAMIC_RECORDS;

    fn request(ttl: u16, creator: NodeIndex) -> RequestMsg {
        RequestMsg {
            created_at: 500,
            ttl,
            id: 500,
            creator,
        }
    }

    fn node_with(id: NodeIndex, peers: &[NodeIndex]) -> NodeState {
        let mut node = NodeState::new(id, 0);
        for &peer in peers {
            node.insert_neighbor(peer).unwrap();
        }
        node.sync_degree();
        node
    }

    /// Nodes below 10 are churn-exempt so per-tick tests stay put.
    fn pinned(config: ProtocolConfig) -> ProtocolConfig {
        config.with_hierarchy(HierarchyMode::Core { core_size: 10 })
    }

    fn dandelion(stem_steps: u32) -> ProtocolConfig {
        pinned(ProtocolConfig::new(DisseminationMode::Dandelion { stem_steps }).with_max_ttl(20))
    }

    #[test]
    fn test_holder_absorbs_request() {
        let mut harness = Harness::new(ProtocolConfig::default(), 10);
        let mut node = node_with(4, &[1, 2, 3]);
        node.set_status(NodeStatus::Holder);

        on_message(&mut node, &mut harness.ctx(507), 1, Message::Request(request(18, 9))).unwrap();

        assert_eq!(node.status(), NodeStatus::HolderRelayed);
        assert_eq!(harness.stats.deliveries, 1);
        assert_eq!(harness.stats.delivery_ticks_total, 7);
        assert!(harness.outbox.is_empty());

        // A second copy is neither counted nor relayed.
        on_message(&mut node, &mut harness.ctx(508), 2, Message::Request(request(17, 9))).unwrap();
        assert_eq!(harness.stats.deliveries, 1);
        assert!(harness.outbox.is_empty());
        assert_eq!(harness.stats.requests_received, 2);
    }

    #[test]
    fn test_dandelion_holder_absorbs_stem_copies() {
        let mut harness = Harness::new(dandelion(5), 10);
        let mut node = node_with(4, &[1, 2, 3]);
        node.set_status(NodeStatus::Holder);

        on_message(&mut node, &mut harness.ctx(502), 1, Message::Request(request(18, 9))).unwrap();
        on_message(&mut node, &mut harness.ctx(503), 2, Message::Request(request(17, 9))).unwrap();

        assert_eq!(node.status(), NodeStatus::HolderRelayed);
        assert_eq!(harness.stats.deliveries, 1);
        assert!(harness.outbox.is_empty());
    }

    #[test]
    fn test_dandelion_plus_plus_holder_absorbs_stem_copies() {
        let config = pinned(
            ProtocolConfig::new(DisseminationMode::DandelionPlusPlus { stem_steps: 5 }).with_max_ttl(20),
        );
        let mut harness = Harness::new(config, 30);
        // Node 25 is in the stem during the epoch starting at 500.
        let mut node = node_with(25, &[1, 2, 3]);
        node.set_status(NodeStatus::Holder);

        on_message(&mut node, &mut harness.ctx(502), 1, Message::Request(request(18, 9))).unwrap();
        on_message(&mut node, &mut harness.ctx(503), 2, Message::Request(request(17, 9))).unwrap();

        assert_eq!(node.status(), NodeStatus::HolderRelayed);
        assert!(harness.outbox.is_empty());
    }

    #[test]
    fn test_active_node_relays_once_per_epoch() {
        let mut harness = Harness::new(ProtocolConfig::default(), 10);
        let mut node = node_with(4, &[1, 2, 3]);

        on_message(&mut node, &mut harness.ctx(502), 1, Message::Request(request(18, 9))).unwrap();
        assert_eq!(node.status(), NodeStatus::ActiveRelayed);
        assert_eq!(harness.request_targets(), vec![2, 3]);
        for entry in &harness.outbox {
            let Message::Request(sent) = entry.message else {
                panic!("expected request");
            };
            assert_eq!(sent.ttl, 17);
            assert_eq!(sent.creator, 9);
            assert_eq!(entry.deliver_at, 503);
        }

        harness.outbox.clear();
        on_message(&mut node, &mut harness.ctx(503), 2, Message::Request(request(17, 9))).unwrap();
        assert!(harness.outbox.is_empty());
    }

    #[test]
    fn test_inactive_node_drops_request() {
        let mut harness = Harness::new(dandelion(5), 10);
        let mut node = node_with(4, &[1, 2, 3]);
        node.set_status(NodeStatus::Inactive);
        on_message(&mut node, &mut harness.ctx(502), 1, Message::Request(request(18, 9))).unwrap();
        assert_eq!(node.status(), NodeStatus::Inactive);
        assert!(harness.outbox.is_empty());
    }

    #[test]
    fn test_dandelion_stem_window_relays_again() {
        let mut harness = Harness::new(dandelion(5), 10);
        let mut node = node_with(4, &[1, 2, 3]);
        node.set_status(NodeStatus::ActiveRelayed);

        on_message(&mut node, &mut harness.ctx(503), 1, Message::Request(request(17, 9))).unwrap();
        assert_eq!(harness.request_targets().len(), 1);
        assert_eq!(node.received(), ReceivedMarker::Timestamp(503));

        // Outside the stem window: no relay, loop-back confirmed.
        harness.outbox.clear();
        on_message(&mut node, &mut harness.ctx(510), 1, Message::Request(request(10, 9))).unwrap();
        assert!(harness.outbox.is_empty());
        assert_eq!(node.received(), ReceivedMarker::LoopbackConfirmed);

        // Confirmation sticks even inside a later stem window.
        on_message(&mut node, &mut harness.ctx(522), 1, Message::Request(request(18, 9))).unwrap();
        assert_eq!(node.received(), ReceivedMarker::LoopbackConfirmed);
    }

    #[test]
    fn test_link_and_unlink_adjust_cache() {
        let mut harness = Harness::new(ProtocolConfig::default(), 10);
        let mut node = node_with(0, &[1]);

        on_message(&mut node, &mut harness.ctx(500), 2, Message::Link).unwrap();
        on_message(&mut node, &mut harness.ctx(500), 2, Message::Link).unwrap();
        assert_eq!(node.advertised_degree(), 2);

        on_message(&mut node, &mut harness.ctx(501), 2, Message::Unlink).unwrap();
        on_message(&mut node, &mut harness.ctx(501), 7, Message::Unlink).unwrap();
        assert_eq!(node.advertised_degree(), 1);
        assert!(node.neighbors().contains(1));
    }

    #[test]
    fn test_link_beyond_capacity_is_fatal() {
        let mut harness = Harness::new(ProtocolConfig::default(), 10);
        let mut node = NodeState::new(0, 0);
        for peer in 1..=MAX_DYNAMIC_RECORDS as NodeIndex {
            node.insert_neighbor(peer).unwrap();
        }
        let err = on_message(&mut node, &mut harness.ctx(600), 9999, Message::Link).unwrap_err();
        assert_eq!(
            err,
            NodeError::NeighborCapacity {
                tick: 600,
                node: 0,
                peer: 9999,
                capacity: MAX_DYNAMIC_RECORDS
            }
        );
    }

    #[test]
    fn test_building_step_deactivates_share_of_nodes() {
        let config = ProtocolConfig::default().with_active_target(30).with_building_step(1);
        let mut harness = Harness::new(config, 1000);
        let mut inactive = 0;
        for id in 0..1000 {
            let mut node = NodeState::new(id, 0);
            on_tick(&mut node, &mut harness.ctx(1)).unwrap();
            if node.status() == NodeStatus::Inactive {
                inactive += 1;
            }
        }
        assert!((620..780).contains(&inactive), "{inactive} inactive");
    }

    #[test]
    fn test_degree_synced_at_max_ttl() {
        let mut harness = Harness::new(ProtocolConfig::default().with_max_ttl(20), 10);
        let mut node = NodeState::new(0, 0);
        node.insert_neighbor(1).unwrap();
        node.insert_neighbor(2).unwrap();
        on_tick(&mut node, &mut harness.ctx(19)).unwrap();
        assert_eq!(node.advertised_degree(), 0);
        on_tick(&mut node, &mut harness.ctx(20)).unwrap();
        assert_eq!(node.advertised_degree(), 2);
    }

    #[test]
    fn test_isolated_active_node_self_heals() {
        let mut harness = Harness::new(ProtocolConfig::default().with_max_ttl(20), 50);
        let mut node = NodeState::new(0, 0);
        node.sync_degree();
        on_tick(&mut node, &mut harness.ctx(21)).unwrap();
        assert!(harness.sent("Link").len() >= 5);
    }

    #[test]
    fn test_boundary_resets_and_assigns_roles() {
        let mut harness = Harness::new(pinned(ProtocolConfig::default().with_max_ttl(20)), 10);
        harness.roles = EpochRoles {
            applicant: Some(1),
            holder: Some(2),
        };

        let mut relayed = node_with(0, &[1]);
        relayed.set_status(NodeStatus::ActiveRelayed);
        relayed.set_received(ReceivedMarker::LoopbackConfirmed);
        on_tick(&mut relayed, &mut harness.ctx(40)).unwrap();
        assert_eq!(relayed.status(), NodeStatus::Active);
        assert_eq!(relayed.received(), ReceivedMarker::None);

        let mut holder = node_with(2, &[1]);
        on_tick(&mut holder, &mut harness.ctx(40)).unwrap();
        assert_eq!(holder.status(), NodeStatus::Holder);

        // Before stabilization the applicant takes its role but sends nothing.
        let mut applicant = node_with(1, &[0, 2]);
        on_tick(&mut applicant, &mut harness.ctx(40)).unwrap();
        assert_eq!(applicant.status(), NodeStatus::Applicant);
        assert!(harness.request_targets().is_empty());
        assert_eq!(harness.stats.epochs, 0);
    }

    #[test]
    fn test_applicant_originates_after_stabilization() {
        let mut harness = Harness::new(ProtocolConfig::default().with_max_ttl(20), 10);
        harness.roles = EpochRoles {
            applicant: Some(1),
            holder: Some(2),
        };
        let mut applicant = node_with(1, &[0, 2, 3]);

        on_tick(&mut applicant, &mut harness.ctx(420)).unwrap();

        assert_eq!(harness.stats.epochs, 1);
        assert_eq!(harness.request_targets(), vec![0, 2, 3]);
        assert_eq!(applicant.received(), ReceivedMarker::Timestamp(420));
        let Message::Request(sent) = harness.outbox[0].message else {
            panic!("expected request");
        };
        assert_eq!(sent.ttl, 20);
        assert_eq!(sent.creator, 1);
    }

    #[test]
    fn test_dandelion_applicant_starts_stem() {
        let mut harness = Harness::new(dandelion(5), 10);
        harness.roles = EpochRoles {
            applicant: Some(1),
            holder: Some(2),
        };
        let mut applicant = node_with(1, &[0, 2, 3]);

        on_tick(&mut applicant, &mut harness.ctx(420)).unwrap();

        let targets = harness.request_targets();
        assert_eq!(targets.len(), 1);
        let Message::Request(sent) = harness.outbox[0].message else {
            panic!("expected request");
        };
        assert_eq!(sent.ttl, 19);
    }

    #[test]
    fn test_dandelion_recovery_fires_once() {
        let mut harness = Harness::new(dandelion(5), 10);
        let mut node = node_with(3, &[1, 2]);
        node.set_status(NodeStatus::ActiveRelayed);
        // Received in the stem phase at offset 2 of the epoch starting at 500.
        node.set_received(ReceivedMarker::Timestamp(502));

        // 502 + 5 + 4 = 511: not yet.
        assert!(!needs_recovery(&node, &harness.ctx(511)));
        assert!(needs_recovery(&node, &harness.ctx(512)));

        on_tick(&mut node, &mut harness.ctx(512)).unwrap();
        assert_eq!(harness.stats.recoveries, 1);
        assert_eq!(node.received(), ReceivedMarker::LoopbackConfirmed);
        let Message::Request(sent) = harness.outbox[0].message else {
            panic!("expected request");
        };
        // 20 - 12 - 1
        assert_eq!(sent.ttl, 7);
        assert_eq!(sent.creator, 3);

        on_tick(&mut node, &mut harness.ctx(513)).unwrap();
        assert_eq!(harness.stats.recoveries, 1);
    }

    #[test]
    fn test_no_recovery_before_stabilization_or_outside_dandelion() {
        let mut harness = Harness::new(dandelion(5), 10);
        let mut node = node_with(3, &[1, 2]);
        node.set_received(ReceivedMarker::Timestamp(302));
        assert!(!needs_recovery(&node, &harness.ctx(390)));

        let mut harness = Harness::new(ProtocolConfig::default(), 10);
        node.set_received(ReceivedMarker::Timestamp(502));
        assert!(!needs_recovery(&node, &harness.ctx(515)));
    }

    #[test]
    fn test_dandelion_plus_plus_recovery_needs_stem() {
        let config =
            ProtocolConfig::new(DisseminationMode::DandelionPlusPlus { stem_steps: 5 }).with_max_ttl(20);
        let mut harness = Harness::new(config, 100);

        // Node 25 is in the stem during epoch 25, node 50 is not.
        let mut stem = node_with(25, &[1, 2]);
        stem.set_received(ReceivedMarker::Timestamp(501));
        assert!(!needs_recovery(&stem, &harness.ctx(508)));
        assert!(needs_recovery(&stem, &harness.ctx(509)));

        let mut fluff = node_with(50, &[1, 2]);
        fluff.set_received(ReceivedMarker::Timestamp(501));
        assert!(!needs_recovery(&fluff, &harness.ctx(509)));
    }

    #[test]
    fn test_migration_message_replaces_neighbors() {
        let mut harness = Harness::new(ProtocolConfig::default(), 10);
        let source = node_with(5, &[1, 2, 3]);
        let payload = source.export_migration().unwrap();
        let mut node = NodeState::new(5, 1);

        on_message(&mut node, &mut harness.ctx(600), 5, Message::Migration(payload)).unwrap();

        assert_eq!(node.neighbors(), source.neighbors());
        assert_eq!(node.lp(), 1);
    }
}
