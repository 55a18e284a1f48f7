//! Messages exchanged between simulated nodes.
//!
//! Sizes are computed from a fixed layout (one tag byte followed by the
//! static fields) so the transport can enforce [`BUFFER_SIZE`](crate::BUFFER_SIZE)
//! without serializing anything.

use crate::{NodeIndex, Tick, MAX_DYNAMIC_RECORDS};
use serde::{Deserialize, Serialize};

const TAG_SIZE: usize = 1;
// created_at (8) + ttl (2) + id (8) + creator (4)
const REQUEST_BODY_SIZE: usize = 22;
// record count
const MIGRATION_HEADER_SIZE: usize = 4;
const MIGRATION_RECORD_SIZE: usize = 8;

/// A dissemination request travelling through the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestMsg {
    /// Tick at which the current hop was originated.
    pub created_at: Tick,
    /// Remaining hops. Requests are only sent while this is positive.
    pub ttl: u16,
    pub id: u64,
    /// Node that started the round.
    pub creator: NodeIndex,
}

/// Wire messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(RequestMsg),
    /// Sender added the receiver to its neighbor set.
    Link,
    /// Sender dropped the receiver from its neighbor set.
    Unlink,
    /// Neighbor state of a node moving between logical processes.
    Migration(MigrationPayload),
}

impl Message {
    /// Encoded size in bytes.
    pub fn wire_size(&self) -> usize {
        TAG_SIZE
            + match self {
                Message::Request(_) => REQUEST_BODY_SIZE,
                Message::Link | Message::Unlink => 0,
                Message::Migration(payload) => payload.body_size(),
            }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Request(_) => "Request",
            Message::Link => "Link",
            Message::Unlink => "Unlink",
            Message::Migration(_) => "Migration",
        }
    }

    /// Topology maintenance, as opposed to dissemination traffic.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Message::Request(_))
    }
}

/// One neighbor-set entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub key: NodeIndex,
    pub value: NodeIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    #[error("migration payload holds {count} records, limit is {limit}")]
    TooManyRecords { count: usize, limit: usize },
}

/// Ordered list of neighbor records, at most [`MAX_DYNAMIC_RECORDS`] long.
///
/// Serialized as a plain record list; deserializing enforces the same bound
/// as [`MigrationPayload::new`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MigrationRecord>", into = "Vec<MigrationRecord>")]
pub struct MigrationPayload {
    records: Vec<MigrationRecord>,
}

impl MigrationPayload {
    pub fn new(records: Vec<MigrationRecord>) -> Result<Self, MigrationError> {
        if records.len() > MAX_DYNAMIC_RECORDS {
            return Err(MigrationError::TooManyRecords {
                count: records.len(),
                limit: MAX_DYNAMIC_RECORDS,
            });
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[MigrationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn body_size(&self) -> usize {
        MIGRATION_HEADER_SIZE + self.records.len() * MIGRATION_RECORD_SIZE
    }
}

impl TryFrom<Vec<MigrationRecord>> for MigrationPayload {
    type Error = MigrationError;

    fn try_from(records: Vec<MigrationRecord>) -> Result<Self, Self::Error> {
        Self::new(records)
    }
}

impl From<MigrationPayload> for Vec<MigrationRecord> {
    fn from(payload: MigrationPayload) -> Self {
        payload.records
    }
}
