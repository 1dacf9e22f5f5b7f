//! Error types for transport driver operations.

use crate::messages::ChannelId;
use shuffle_rs::ExchangeError;
use thiserror::Error;

/// Errors that can occur while driving a channel reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The channel has been closed.
    #[error("channel is closed")]
    Closed,

    /// A message was routed to a reader serving a different channel.
    #[error("message for {actual} routed to reader serving {expected}")]
    UnknownChannel {
        /// The channel this reader serves.
        expected: ChannelId,
        /// The channel named in the message.
        actual: ChannelId,
    },

    /// The underlying exchange rejected the operation.
    #[error("exchange failure: {0}")]
    Exchange(#[from] ExchangeError),
}

impl TransportError {
    /// Returns `true` if the caller may retry later.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Exchange(e) if e.is_recoverable())
    }

    /// Returns `true` if the channel is permanently unusable.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Closed | Self::Exchange(ExchangeError::ChannelClosed)
        )
    }
}
