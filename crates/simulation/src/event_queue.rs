//! Delivery queue with deterministic ordering.

use gossipsim_core::{EventPriority, OutboxEntry};
use gossipsim_types::{Message, NodeIndex, Tick};
use std::cmp::Ordering;

/// Key for ordering deliveries in the queue.
///
/// Deliveries are ordered by:
/// 1. Tick (earlier first)
/// 2. Priority (structural before requests)
/// 3. Receiving node
/// 4. Sequence number (FIFO for same tick/priority/node)
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    pub time: Tick,
    pub priority: EventPriority,
    pub node_index: NodeIndex,
    pub sequence: u64,
}

impl EventKey {
    pub fn new(entry: &OutboxEntry, sequence: u64) -> Self {
        Self {
            time: entry.deliver_at,
            priority: entry.priority(),
            node_index: entry.to,
            sequence,
        }
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match self.priority.cmp(&other.priority) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match self.node_index.cmp(&other.node_index) {
            Ordering::Equal => {}
            ord => return ord,
        }

        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A queued message. The receiver is the key's `node_index`.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub from: NodeIndex,
    pub message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(time: Tick, priority: EventPriority, node_index: NodeIndex, sequence: u64) -> EventKey {
        EventKey {
            time,
            priority,
            node_index,
            sequence,
        }
    }

    #[test]
    fn test_event_key_ordering() {
        assert!(key(1, EventPriority::Request, 0, 1) < key(2, EventPriority::Structural, 0, 0));
    }

    #[test]
    fn test_structural_first_at_same_tick() {
        let link = key(5, EventPriority::Structural, 9, 2);
        let request = key(5, EventPriority::Request, 0, 1);
        assert!(link < request, "links should land before requests");
    }

    #[test]
    fn test_node_then_sequence() {
        assert!(key(5, EventPriority::Request, 0, 9) < key(5, EventPriority::Request, 1, 1));
        assert!(key(5, EventPriority::Request, 1, 1) < key(5, EventPriority::Request, 1, 2));
    }
}
