//! Outgoing messages and their delivery priority.

use gossipsim_types::{Message, NodeIndex, Tick};

/// Priority levels for deliveries within the same tick.
///
/// Lower values are processed first. Topology changes land before requests
/// so a relay decided at tick `t` sees every link created at `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Link, Unlink and Migration.
    Structural = 0,
    /// Dissemination requests.
    Request = 1,
}

/// A message scheduled for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub deliver_at: Tick,
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub message: Message,
}

impl OutboxEntry {
    pub fn priority(&self) -> EventPriority {
        if self.message.is_structural() {
            EventPriority::Structural
        } else {
            EventPriority::Request
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossipsim_types::RequestMsg;

    #[test]
    fn test_structural_before_request() {
        let link = OutboxEntry {
            deliver_at: 5,
            from: 1,
            to: 2,
            message: Message::Link,
        };
        let request = OutboxEntry {
            deliver_at: 5,
            from: 1,
            to: 2,
            message: Message::Request(RequestMsg {
                created_at: 4,
                ttl: 3,
                id: 4,
                creator: 1,
            }),
        };
        assert!(link.priority() < request.priority());
    }
}
