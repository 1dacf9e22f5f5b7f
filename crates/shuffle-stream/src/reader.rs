//! Async channel reader implementing `futures::Stream`.

use crate::config::ReaderConfig;
use crate::error::TransportError;
#[cfg(debug_assertions)]
use crate::invariants::{
    debug_assert_batch_bounded, debug_assert_drained_before_end, debug_assert_staged_cleared,
};
use crate::listener::NotifyListener;
use crate::messages::{AddCredit, BufferResponse, ChannelId, CloseChannel};
use shuffle_rs::{AvailabilityListener, CreditFlowChannel, SubpartitionQueue, SubpartitionView};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::{interval, Interval};

use futures_core::{Future, Stream};
use pin_project_lite::pin_project;

pin_project! {
    /// The transport driver for one subpartition: sole caller of
    /// `get_next_buffer` and sole availability listener.
    ///
    /// Implements `futures::Stream<Item = BufferResponse>` with a hybrid
    /// event-driven + polling strategy: the exchange wakes the reader through
    /// a [`NotifyListener`], and a poll-interval timer acts as a safety net.
    /// Each wakeup drains up to `batch_hint` deliverable entries into a
    /// staged queue.
    ///
    /// # Credit
    ///
    /// The remote consumer's `AddCredit` messages are applied through
    /// [`on_add_credit`](ChannelReader::on_add_credit); every
    /// [`BufferResponse`] carries the current backlog so the consumer can
    /// size its grants in batches.
    ///
    /// # End of stream
    ///
    /// Yields `None` once the producer has finished and everything queued was
    /// delivered, or after the channel closes. Close releases all buffers
    /// back to their pool, including staged ones.
    pub struct ChannelReader {
        channel_id: ChannelId,
        view: SubpartitionView,
        credit: CreditFlowChannel,
        listener: Arc<NotifyListener>,
        config: ReaderConfig,
        #[pin]
        poll_timer: Interval,
        staged: VecDeque<BufferResponse>,
        done: bool,
    }
}

impl ChannelReader {
    /// Attaches a reader to `queue` as its single consumer.
    ///
    /// Creates the view, registers the notify listener and announces
    /// `config.initial_credit` to the producer.
    pub fn attach(
        queue: &SubpartitionQueue,
        channel_id: ChannelId,
        config: ReaderConfig,
    ) -> Result<Self, TransportError> {
        let view = queue.create_view()?;
        let listener = Arc::new(NotifyListener::new());
        let dyn_listener: Arc<dyn AvailabilityListener> = listener.clone();
        view.register_listener(dyn_listener)?;
        let credit = view.credit_channel();
        if config.initial_credit > 0 {
            credit.grant_credit(config.initial_credit)?;
        }
        tracing::debug!(%channel_id, initial_credit = config.initial_credit, "reader attached");

        Ok(Self {
            channel_id,
            view,
            credit,
            listener,
            poll_timer: interval(config.poll_interval),
            staged: VecDeque::with_capacity(config.batch_hint),
            config,
            done: false,
        })
    }

    /// Returns the channel this reader serves.
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Returns the sequence of the latest priority event, if one arrived
    /// since the last call. Transports use this to fast-path control events.
    pub fn take_priority_sequence(&self) -> Option<u64> {
        self.listener.take_priority_sequence()
    }

    /// Returns the upstream backlog of undelivered data entries.
    pub fn backlog(&self) -> usize {
        self.view.backlog()
    }

    /// Applies a consumer credit grant.
    pub fn on_add_credit(&self, msg: AddCredit) -> Result<(), TransportError> {
        if msg.channel_id != self.channel_id {
            return Err(TransportError::UnknownChannel {
                expected: self.channel_id,
                actual: msg.channel_id,
            });
        }
        tracing::trace!(channel_id = %self.channel_id, credits = msg.num_credits, "credit granted");
        self.credit.grant_credit(msg.num_credits)?;
        Ok(())
    }

    /// Processes an explicit channel teardown.
    ///
    /// Idempotent. Releases every queued and staged buffer back to the pool;
    /// the stream yields `None` on its next poll.
    pub fn on_close_channel(&mut self, msg: CloseChannel) -> Result<(), TransportError> {
        if msg.channel_id != self.channel_id {
            return Err(TransportError::UnknownChannel {
                expected: self.channel_id,
                actual: msg.channel_id,
            });
        }
        tracing::debug!(channel_id = %self.channel_id, "channel closed");
        self.credit.close();
        self.staged.clear();
        self.done = true;

        #[cfg(debug_assertions)]
        debug_assert_staged_cleared!(self.staged.is_empty());
        Ok(())
    }

    /// Returns `true` once the stream has terminated.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Moves deliverable entries from the view into the staged queue, up to the
/// batch hint. Flips `done` when the channel is gone or the exchange fails.
fn drain_staged(
    view: &SubpartitionView,
    channel_id: ChannelId,
    staged: &mut VecDeque<BufferResponse>,
    batch_hint: usize,
    done: &mut bool,
) {
    let budget = batch_hint.saturating_sub(staged.len());
    for _ in 0..budget {
        match view.get_next_buffer() {
            Ok(Some(polled)) => {
                staged.push_back(BufferResponse::from_polled(channel_id, polled));
            }
            Ok(None) => break,
            Err(err) => {
                if err.is_fatal() {
                    tracing::error!(%channel_id, %err, "exchange failure, ending stream");
                } else {
                    tracing::debug!(%channel_id, %err, "channel gone, ending stream");
                }
                *done = true;
                break;
            }
        }
    }

    #[cfg(debug_assertions)]
    debug_assert_batch_bounded!(staged.len(), batch_hint);
}

impl Stream for ChannelReader {
    type Item = BufferResponse;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Yield a staged response if we have one.
        if let Some(resp) = this.staged.pop_front() {
            return Poll::Ready(Some(resp));
        }
        if *this.done {
            return Poll::Ready(None);
        }

        // Drain whatever became deliverable since the last poll.
        drain_staged(
            this.view,
            *this.channel_id,
            this.staged,
            this.config.batch_hint,
            this.done,
        );
        if let Some(resp) = this.staged.pop_front() {
            return Poll::Ready(Some(resp));
        }
        if *this.done {
            return Poll::Ready(None);
        }

        // Producer finished and everything was delivered: end of stream.
        if this.view.is_finished() && this.view.backlog() == 0 {
            #[cfg(debug_assertions)]
            debug_assert_drained_before_end!(this.view.backlog());
            *this.done = true;
            return Poll::Ready(None);
        }

        // Register for the next availability notification.
        let notified = this.listener.notified();
        tokio::pin!(notified);
        if notified.as_mut().poll(cx).is_ready() {
            // A notification raced our drain; re-poll immediately.
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        // Poll interval timer as safety net. Looping until Pending keeps the
        // timer waker registered for the next tick.
        while this.poll_timer.as_mut().poll_tick(cx).is_ready() {
            drain_staged(
                this.view,
                *this.channel_id,
                this.staged,
                this.config.batch_hint,
                this.done,
            );
            if let Some(resp) = this.staged.pop_front() {
                return Poll::Ready(Some(resp));
            }
            if *this.done {
                return Poll::Ready(None);
            }
        }

        Poll::Pending
    }
}
