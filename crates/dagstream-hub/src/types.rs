use serde::{Deserialize, Serialize};

/// Counters reported by the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStats {
    /// Mailboxes currently registered.
    pub subscribers: usize,
    /// Publish commands handled.
    pub published: u64,
    /// Individual mailbox deliveries.
    pub delivered: u64,
    /// Deliveries skipped because a mailbox was full (`DropNew` only).
    pub dropped: u64,
}

/// Outcome of handing one message to one mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Delivered,
    Dropped,
    /// The consumer half is gone.
    Closed,
}
