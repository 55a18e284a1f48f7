//! Relay decisions for every dissemination mode.
//!
//! [`forward_to_neighbors`] is the entry point used by the inbound handler
//! and the epoch controller; it applies the broadcast gate and then calls
//! [`forward`], which picks the recipients for the configured mode.
//!
//! | Mode | Recipients |
//! |------|------------|
//! | Broadcast | all neighbors except forwarder and creator |
//! | FixedProbability | each neighbor with `threshold` percent, except forwarder and creator |
//! | DegreeDependent | each neighbor with `f(degree)`, always when its degree is below 3 |
//! | FixedFanout | 3 distinct neighbors, or all when own degree is at most 3 |
//! | Dandelion | stem: one random neighbor other than the forwarder; fluff: all except forwarder |
//! | Dandelion++ | as Dandelion, with the phase chosen per node and epoch |

use crate::config::{DisseminationMode, ProbabilityFunction};
use crate::context::NodeContext;
use crate::error::NodeError;
use crate::state::NodeState;
use gossipsim_types::{NodeIndex, RequestMsg, Tick};
use rand::Rng;
use std::collections::BTreeSet;

/// Neighbors with an advertised degree below this always receive the request
/// in degree-dependent mode.
const LOW_DEGREE: u32 = 3;

/// Recipients per relay in fixed-fanout mode.
const FANOUT: usize = 3;

/// Whether node `id` is in the stem phase during the epoch containing `now`.
///
/// The choice rotates every epoch so different nodes form the stem each
/// round.
pub fn is_stem(id: NodeIndex, now: Tick, max_ttl: u16, stem_steps: u32) -> bool {
    let epoch = now / Tick::from(max_ttl);
    (Tick::from(id) + epoch * 7) % 100 <= Tick::from(stem_steps)
}

/// Whether this node is in the stem phase now. Always false outside Dandelion++.
pub fn node_is_stem(node: &NodeState, ctx: &NodeContext<'_>) -> bool {
    match ctx.config.mode {
        DisseminationMode::DandelionPlusPlus { stem_steps } => {
            is_stem(node.id(), ctx.now, ctx.config.max_ttl, stem_steps)
        }
        _ => false,
    }
}

/// Degree-dependent acceptance of one neighbor for a draw in `[0, 1)`.
pub fn degree_admits(
    function: ProbabilityFunction,
    coefficient: f64,
    degree: u32,
    draw: f64,
) -> bool {
    degree < LOW_DEGREE || draw <= function.probability(degree, coefficient)
}

/// Relays `request` unless the broadcast gate rejects it.
///
/// `request.ttl` is the TTL the recipients will see. Returns the number of
/// requests scheduled.
pub fn forward_to_neighbors(
    node: &NodeState,
    ctx: &mut NodeContext<'_>,
    request: RequestMsg,
    forwarder: NodeIndex,
) -> Result<usize, NodeError> {
    if let DisseminationMode::Broadcast { threshold } = ctx.config.mode {
        let draw: f64 = ctx.rng.gen_range(0.0..100.0);
        if draw > threshold {
            return Ok(0);
        }
    }
    forward(node, ctx, request, forwarder)
}

/// Sends `request` to the recipients chosen by the configured mode.
pub fn forward(
    node: &NodeState,
    ctx: &mut NodeContext<'_>,
    request: RequestMsg,
    forwarder: NodeIndex,
) -> Result<usize, NodeError> {
    let excluded = |peer: NodeIndex| peer == forwarder || peer == request.creator;
    let mut targets = Vec::new();

    match ctx.config.mode {
        DisseminationMode::Broadcast { .. } => {
            targets.extend(node.neighbors().iter().filter(|&peer| !excluded(peer)));
        }
        DisseminationMode::FixedProbability { threshold } => {
            for peer in node.neighbors().iter() {
                let draw: f64 = ctx.rng.gen_range(0.0..100.0);
                if draw <= threshold && !excluded(peer) {
                    targets.push(peer);
                }
            }
        }
        DisseminationMode::DegreeDependent {
            function,
            coefficient,
        } => {
            for peer in node.neighbors().iter().filter(|&peer| !excluded(peer)) {
                let draw: f64 = ctx.rng.gen_range(0.0..100.0) / 100.0;
                let degree = ctx.directory.peer(peer).map_or(0, |view| view.degree);
                if degree_admits(function, coefficient, degree, draw) {
                    targets.push(peer);
                }
            }
        }
        DisseminationMode::FixedFanout => {
            if node.advertised_degree() <= LOW_DEGREE {
                targets.extend(node.neighbors().iter().filter(|&peer| !excluded(peer)));
            } else {
                let wanted = FANOUT.min(node.neighbor_count());
                let mut chosen = BTreeSet::new();
                while chosen.len() < wanted {
                    if let Some(peer) = node.random_neighbor(ctx.rng) {
                        if chosen.insert(peer) && !excluded(peer) {
                            targets.push(peer);
                        }
                    }
                }
            }
        }
        DisseminationMode::Dandelion { stem_steps } => {
            let hops = u32::from(ctx.config.max_ttl.saturating_sub(request.ttl));
            if hops <= stem_steps {
                targets.extend(node.random_neighbor_except(ctx.rng, forwarder));
            } else {
                targets.extend(node.neighbors().iter().filter(|&peer| peer != forwarder));
            }
        }
        DisseminationMode::DandelionPlusPlus { stem_steps } => {
            if is_stem(node.id(), ctx.now, ctx.config.max_ttl, stem_steps) {
                targets.extend(node.random_neighbor_except(ctx.rng, forwarder));
            } else {
                targets.extend(node.neighbors().iter().filter(|&peer| peer != forwarder));
            }
        }
    }

    let mut sent = 0;
    for peer in targets {
        if ctx.send_request(node.id(), peer, request)? {
            sent += 1;
        }
    }
    Ok(sent)
}
