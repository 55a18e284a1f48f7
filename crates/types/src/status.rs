//! Node status and the loop-back marker used by the Dandelion family.

use crate::Tick;
use serde::{Deserialize, Serialize};

/// Role of a node within the current epoch.
///
/// `Inactive` nodes are churned out and take no part in dissemination.
/// Every other status counts as "active" for attachment and role selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeStatus {
    Inactive,
    #[default]
    Active,
    /// Originator of the current epoch's request.
    Applicant,
    /// Designated receiver of the current epoch's request.
    Holder,
    /// Already relayed this epoch.
    ActiveRelayed,
    /// Holder that has received the request.
    HolderRelayed,
}

impl NodeStatus {
    /// Anything but `Inactive`.
    pub fn is_active(self) -> bool {
        self != NodeStatus::Inactive
    }

    /// Statuses that churn may deactivate.
    pub fn is_churn_eligible(self) -> bool {
        matches!(self, NodeStatus::Active | NodeStatus::ActiveRelayed)
    }
}

/// Last stem-phase reception of this epoch's request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceivedMarker {
    #[default]
    None,
    Timestamp(Tick),
    /// The request came back after the stem phase; no recovery needed.
    LoopbackConfirmed,
}

impl ReceivedMarker {
    pub fn is_loopback_confirmed(self) -> bool {
        self == ReceivedMarker::LoopbackConfirmed
    }

    pub fn timestamp(self) -> Option<Tick> {
        match self {
            ReceivedMarker::Timestamp(t) => Some(t),
            _ => None,
        }
    }
}
