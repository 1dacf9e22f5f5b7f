//! Logical messages exchanged with the transport layer.

use shuffle_rs::{Entry, PolledEntry};
use std::fmt;

/// Identifier of one logical (producer, consumer) channel on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch-{}", self.0)
    }
}

/// One entry handed to the transport for sending.
#[derive(Debug)]
pub struct BufferResponse {
    pub channel_id: ChannelId,
    /// Submission sequence number of the payload entry.
    pub sequence_number: u64,
    /// Data entries still queued upstream; consumers size credit grants
    /// from this figure instead of granting one round-trip per buffer.
    pub backlog: usize,
    /// Wire-header copy of the payload's lane.
    pub is_priority: bool,
    /// The delivered entry. Dropping a data payload recycles its buffer.
    pub payload: Entry,
}

impl BufferResponse {
    pub(crate) fn from_polled(channel_id: ChannelId, polled: PolledEntry) -> Self {
        let is_priority = polled.entry.is_priority();
        Self {
            channel_id,
            sequence_number: polled.sequence,
            backlog: polled.backlog,
            is_priority,
            payload: polled.entry,
        }
    }
}

/// Consumer-to-producer credit grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddCredit {
    pub channel_id: ChannelId,
    pub num_credits: u32,
}

/// Explicit channel teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseChannel {
    pub channel_id: ChannelId,
}
