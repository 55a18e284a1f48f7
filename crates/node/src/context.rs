//! Everything a node may use while handling one tick or one message.

use crate::config::ProtocolConfig;
use crate::error::NodeError;
use crate::stats::DisseminationStats;
use gossipsim_core::{NodeDirectory, OutboxEntry, Scheduler};
use gossipsim_types::{Message, NodeIndex, RequestMsg, Tick, BUFFER_SIZE, FLIGHT_TIME};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

/// Applicant and holder of the current epoch, if any were chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpochRoles {
    pub applicant: Option<NodeIndex>,
    pub holder: Option<NodeIndex>,
}

impl EpochRoles {
    pub fn is_applicant(&self, id: NodeIndex) -> bool {
        self.applicant == Some(id)
    }

    pub fn is_holder(&self, id: NodeIndex) -> bool {
        self.holder == Some(id)
    }
}

/// Borrowed view of the run, handed to node logic by the runner.
pub struct NodeContext<'a> {
    pub now: Tick,
    pub config: &'a ProtocolConfig,
    pub roles: EpochRoles,
    pub rng: &'a mut ChaCha8Rng,
    pub directory: &'a dyn NodeDirectory,
    pub outbox: &'a mut dyn Scheduler,
    pub stats: &'a mut DisseminationStats,
}

impl NodeContext<'_> {
    /// `now mod max_ttl`.
    pub fn epoch_offset(&self) -> Tick {
        self.config.epoch_offset(self.now)
    }

    /// Schedules `message` for delivery after the flight time.
    pub fn send(&mut self, from: NodeIndex, to: NodeIndex, message: Message) -> Result<(), NodeError> {
        let size = message.wire_size();
        if size > BUFFER_SIZE {
            return Err(NodeError::PayloadTooLarge {
                tick: self.now,
                from,
                to,
                size,
                limit: BUFFER_SIZE,
            });
        }
        match message {
            Message::Request(_) => self.stats.requests_sent += 1,
            Message::Link => self.stats.links_sent += 1,
            Message::Unlink => self.stats.unlinks_sent += 1,
            Message::Migration(_) => {}
        }
        trace!(
            tick = self.now,
            from,
            to,
            kind = message.type_name(),
            "Scheduling message"
        );
        self.outbox.schedule(OutboxEntry {
            deliver_at: self.now + FLIGHT_TIME,
            from,
            to,
            message,
        });
        Ok(())
    }

    /// Sends a request unless its TTL is exhausted.
    pub fn send_request(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        request: RequestMsg,
    ) -> Result<bool, NodeError> {
        if request.ttl == 0 {
            return Ok(false);
        }
        self.send(from, to, Message::Request(request))?;
        Ok(true)
    }
}
