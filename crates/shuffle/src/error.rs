use thiserror::Error;

/// Errors surfaced by the exchange layer.
///
/// Only `ResourceExhausted` is a normal runtime condition (a backpressure
/// signal). `ChannelClosed` is an explicit teardown outcome. The remaining
/// variants indicate that the owning task must fail: they mean a bound that
/// keeps memory finite, or an ordering guarantee, no longer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// The buffer pool has no free segment. Retry after a release.
    #[error("buffer pool exhausted")]
    ResourceExhausted,

    /// The queue, view or channel has been closed or released.
    #[error("channel is closed")]
    ChannelClosed,

    /// Too many priority events are queued and undelivered.
    #[error("too many outstanding priority events (max: {max})")]
    PriorityOverflow {
        /// The configured maximum of outstanding priority events.
        max: usize,
    },

    /// A delivery sequence regressed within its lane.
    #[error("delivery order violated: expected sequence > {expected}, got {actual}")]
    OrderingViolation {
        /// Highest sequence already delivered in the lane.
        expected: u64,
        /// The regressing sequence that was about to be delivered.
        actual: u64,
    },

    /// A second consumer view or listener was attached to a subpartition.
    #[error("consumer already registered")]
    AlreadyRegistered,
}

impl ExchangeError {
    /// Returns `true` if the caller may retry later (backpressure, not failure).
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ResourceExhausted)
    }

    /// Returns `true` if this error must fail the owning task.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PriorityOverflow { .. } | Self::OrderingViolation { .. } | Self::AlreadyRegistered
        )
    }
}
