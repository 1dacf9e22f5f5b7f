use crate::subpartition::QueueShared;
use crate::ExchangeError;
use std::sync::Arc;

/// Observable state of a credit-flow channel.
///
/// `NoCredit` and `HasCredit` alternate as grants arrive and data entries are
/// delivered; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditState {
    /// No data entry may be delivered (priority events still pass).
    NoCredit,
    /// At least one data entry may be delivered.
    HasCredit,
    /// Torn down by transport failure or explicit close. Terminal.
    Closed,
}

/// Per-consumer flow-control handle over a subpartition's channel state.
///
/// Tracks how many buffers the consumer is currently willing to receive and
/// the backlog figure the producer reports alongside delivered data. Grants
/// arrive from the consumer in batches sized off that backlog, which hides
/// the grant round-trip from the steady-state throughput path. The invariant
/// maintained together with the view is
/// `granted_total - delivered_data == credit >= 0`.
///
/// Handles share the subpartition's single mutex; clones are cheap.
#[derive(Clone)]
pub struct CreditFlowChannel {
    shared: Arc<QueueShared>,
}

impl CreditFlowChannel {
    pub(crate) fn new(shared: Arc<QueueShared>) -> Self {
        Self { shared }
    }

    /// Adds `n` credits granted by the consumer.
    ///
    /// On a zero→positive transition with data waiting, the availability
    /// listener fires so the head entry gets delivered. `Err(ChannelClosed)`
    /// once the channel is closed or the view released.
    pub fn grant_credit(&self, n: u32) -> Result<(), ExchangeError> {
        self.shared.grant_credit(n)
    }

    /// Records the backlog reported by the producer alongside delivered data.
    ///
    /// The producer reports true backlog; how large a grant to respond with
    /// is consumer policy.
    pub fn report_backlog(&self, n: usize) {
        self.shared.report_backlog(n);
    }

    /// Returns the most recently reported backlog.
    pub fn last_reported_backlog(&self) -> usize {
        self.shared.last_reported_backlog()
    }

    /// Returns the unspent credit.
    pub fn credit(&self) -> u32 {
        self.shared.credit()
    }

    /// Returns the current channel state.
    pub fn state(&self) -> CreditState {
        if self.shared.is_channel_closed() || self.shared.is_released() {
            CreditState::Closed
        } else if self.shared.credit() > 0 {
            CreditState::HasCredit
        } else {
            CreditState::NoCredit
        }
    }

    /// Closes the channel. Idempotent and terminal.
    ///
    /// Queued entries return their buffers to the pool; subsequent appends,
    /// grants and polls fail with `ChannelClosed`.
    pub fn close(&self) {
        self.shared.close_channel();
    }

    /// Returns `true` once the channel has entered `Closed`.
    pub fn is_closed(&self) -> bool {
        self.shared.is_channel_closed() || self.shared.is_released()
    }
}
