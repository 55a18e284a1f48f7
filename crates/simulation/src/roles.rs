//! Per-epoch choice of applicant and holder.

use gossipsim_node::{EpochRoles, NodeState};
use gossipsim_types::NodeIndex;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Picks two distinct active nodes uniformly at random.
///
/// Returns `None` when fewer than two nodes are active.
pub fn select_roles(nodes: &[NodeState], rng: &mut ChaCha8Rng) -> Option<EpochRoles> {
    let active = nodes.iter().filter(|node| node.status().is_active()).count();
    if active < 2 {
        return None;
    }
    let total = nodes.len() as NodeIndex;
    let is_active = |id: NodeIndex| nodes[id as usize].status().is_active();

    let applicant = loop {
        let id = rng.gen_range(0..total);
        if is_active(id) {
            break id;
        }
    };
    let holder = loop {
        let id = rng.gen_range(0..total);
        if id != applicant && is_active(id) {
            break id;
        }
    };
    Some(EpochRoles {
        applicant: Some(applicant),
        holder: Some(holder),
    })
}
