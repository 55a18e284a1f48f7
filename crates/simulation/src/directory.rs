//! Read-only view of every node except the one being processed.

use gossipsim_core::{NodeDirectory, PeerView};
use gossipsim_node::NodeState;
use gossipsim_types::NodeIndex;

/// The node table split around one node.
///
/// The processed node is reported from a snapshot taken before the split,
/// so lookups of it see its state at the start of the call.
pub(crate) struct Neighborhood<'a> {
    before: &'a [NodeState],
    after: &'a [NodeState],
    current: PeerView,
}

impl NodeDirectory for Neighborhood<'_> {
    fn total_nodes(&self) -> usize {
        self.before.len() + 1 + self.after.len()
    }

    fn peer(&self, id: NodeIndex) -> Option<PeerView> {
        let index = id as usize;
        let split = self.before.len();
        match index.cmp(&split) {
            std::cmp::Ordering::Less => Some(self.before[index].peer_view()),
            std::cmp::Ordering::Equal => Some(self.current),
            std::cmp::Ordering::Greater => self.after.get(index - split - 1).map(NodeState::peer_view),
        }
    }
}

/// Mutable access to node `id` alongside a directory of the rest.
///
/// Returns `None` when `id` is out of range.
pub(crate) fn split_node(
    nodes: &mut [NodeState],
    id: NodeIndex,
) -> Option<(&mut NodeState, Neighborhood<'_>)> {
    let index = id as usize;
    if index >= nodes.len() {
        return None;
    }
    let (before, rest) = nodes.split_at_mut(index);
    let (node, after) = rest.split_first_mut()?;
    let current = node.peer_view();
    Some((
        node,
        Neighborhood {
            before,
            after,
            current,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossipsim_types::NodeStatus;

    #[test]
    fn test_split_sees_every_node() {
        let mut nodes: Vec<NodeState> = (0..5).map(|id| NodeState::new(id, 0)).collect();
        nodes[4].set_status(NodeStatus::Inactive);

        let (node, directory) = split_node(&mut nodes, 2).unwrap();
        node.set_status(NodeStatus::Holder);

        assert_eq!(directory.total_nodes(), 5);
        for id in 0..5 {
            assert_eq!(directory.peer(id).unwrap().id, id);
        }
        assert_eq!(directory.peer(4).unwrap().status, NodeStatus::Inactive);
        // Snapshot from before the call.
        assert_eq!(directory.peer(2).unwrap().status, NodeStatus::Active);
        assert!(directory.peer(5).is_none());
    }

    #[test]
    fn test_split_out_of_range() {
        let mut nodes: Vec<NodeState> = (0..3).map(|id| NodeState::new(id, 0)).collect();
        assert!(split_node(&mut nodes, 3).is_none());
    }
}
