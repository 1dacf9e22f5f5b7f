use crate::credit::CreditFlowChannel;
use crate::subpartition::{Entry, QueueShared};
use crate::ExchangeError;
use std::sync::Arc;

/// Callback capability implemented by the transport driver of a view.
///
/// Whoever drains a [`SubpartitionView`](crate::SubpartitionView) registers
/// one of these to learn when polling is worthwhile again. Notifications are
/// delivered at-least-once per availability transition; duplicates are safe
/// because the driver re-checks availability itself.
pub trait AvailabilityListener: Send + Sync {
    /// Called whenever there might be new deliverable data.
    fn notify_data_available(&self);

    /// Called when a priority event is spliced into the queue.
    ///
    /// `sequence` is the submission index that identifies the event. Fires
    /// even at zero credit — control events must reach the consumer promptly.
    fn notify_priority_event(&self, sequence: u64) {
        let _ = sequence;
    }
}

/// One entry handed to the transport, with its delivery bookkeeping.
#[derive(Debug)]
pub struct PolledEntry {
    /// The delivered entry; dropping a data buffer recycles it.
    pub entry: Entry,
    /// Submission sequence number of the entry.
    pub sequence: u64,
    /// Data entries still queued after this delivery, for credit batching.
    pub backlog: usize,
}

/// Consumer-side cursor over one subpartition queue.
///
/// One-to-one with the attached consumer. Polling never blocks: at zero
/// credit (and no priority head) it returns `Ok(None)` and the registered
/// [`AvailabilityListener`] fires once the queue becomes deliverable again.
pub struct SubpartitionView {
    shared: Arc<QueueShared>,
}

impl std::fmt::Debug for SubpartitionView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubpartitionView").finish_non_exhaustive()
    }
}

impl SubpartitionView {
    pub(crate) fn new(shared: Arc<QueueShared>) -> Self {
        Self { shared }
    }

    /// Registers the availability listener. Exactly-once; a second
    /// registration fails with `AlreadyRegistered` and the first stays in
    /// force.
    pub fn register_listener(
        &self,
        listener: Arc<dyn AvailabilityListener>,
    ) -> Result<(), ExchangeError> {
        self.shared.register_listener(listener)
    }

    /// Pops the next deliverable entry.
    ///
    /// Delivers the head when it is a priority event (credit exempt) or when
    /// credit is available, spending one credit per data entry. `Ok(None)`
    /// means not available right now — wait for the listener. After release
    /// or close every call fails with `ChannelClosed`.
    pub fn get_next_buffer(&self) -> Result<Option<PolledEntry>, ExchangeError> {
        self.shared.poll_next()
    }

    /// Returns a credit-flow handle sharing this view's channel state.
    pub fn credit_channel(&self) -> CreditFlowChannel {
        CreditFlowChannel::new(Arc::clone(&self.shared))
    }

    /// Releases the view. Idempotent.
    ///
    /// All queued buffers recycle into their pool and every subsequent
    /// operation on this view fails with `ChannelClosed`. Safe to call while
    /// a notification is in flight on another thread: the late callback
    /// observes the released state and polls nothing.
    pub fn release(&self) {
        self.shared.release_view();
    }

    /// Returns `true` once the view has been released.
    pub fn is_released(&self) -> bool {
        self.shared.is_released()
    }

    /// Returns `true` once the producer has finished the subpartition.
    pub fn is_finished(&self) -> bool {
        self.shared.is_finished()
    }

    /// Returns the count of queued, not-yet-delivered data entries.
    pub fn backlog(&self) -> usize {
        self.shared.backlog()
    }
}

impl Drop for SubpartitionView {
    /// Dropping the view is consumer detach: queued buffers go back to the
    /// pool so a vanished consumer cannot strand pool segments.
    fn drop(&mut self) {
        self.shared.release_view();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferPool, ExchangeConfig, SubpartitionQueue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config() -> ExchangeConfig {
        ExchangeConfig::new(32, 8, 8, false)
    }

    struct NoopListener;

    impl AvailabilityListener for NoopListener {
        fn notify_data_available(&self) {}
    }

    #[test]
    fn test_listener_registration_is_exactly_once() {
        let queue = SubpartitionQueue::new(&config());
        let view = queue.create_view().unwrap();

        view.register_listener(Arc::new(NoopListener)).unwrap();
        assert_eq!(
            view.register_listener(Arc::new(NoopListener)).unwrap_err(),
            ExchangeError::AlreadyRegistered
        );
    }

    #[test]
    fn test_zero_credit_returns_not_available() {
        let pool = BufferPool::new(&config());
        let queue = SubpartitionQueue::new(&config());
        let view = queue.create_view().unwrap();

        queue.append(pool.acquire().unwrap()).unwrap();
        assert!(view.get_next_buffer().unwrap().is_none());

        view.credit_channel().grant_credit(1).unwrap();
        assert!(view.get_next_buffer().unwrap().is_some());
        assert!(view.get_next_buffer().unwrap().is_none());
    }

    #[test]
    fn test_release_recycles_and_closes() {
        let pool = BufferPool::new(&config());
        let queue = SubpartitionQueue::new(&config());
        let view = queue.create_view().unwrap();

        queue.append(pool.acquire().unwrap()).unwrap();
        queue.append(pool.acquire().unwrap()).unwrap();
        assert_eq!(pool.free_count(), pool.capacity() - 2);

        view.release();
        view.release(); // idempotent
        assert!(view.is_released());
        assert_eq!(pool.free_count(), pool.capacity());

        assert_eq!(
            view.get_next_buffer().unwrap_err(),
            ExchangeError::ChannelClosed
        );
        assert_eq!(
            queue.append(pool.acquire().unwrap()).unwrap_err(),
            ExchangeError::ChannelClosed
        );
    }

    #[test]
    fn test_registration_after_queued_data_still_wakes() {
        let pool = BufferPool::new(&config());
        let queue = SubpartitionQueue::new(&config());
        let view = queue.create_view().unwrap();
        view.credit_channel().grant_credit(1).unwrap();

        // Data arrives before the driver registers.
        queue.append(pool.acquire().unwrap()).unwrap();

        struct Counter(AtomicUsize);
        impl AvailabilityListener for Counter {
            fn notify_data_available(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        let listener = Arc::new(Counter(AtomicUsize::new(0)));
        view.register_listener(listener.clone()).unwrap();
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_during_notification_is_safe() {
        // A listener that releases the view from inside the callback must not
        // deadlock or double-free; the poll that follows sees ChannelClosed.
        let pool = BufferPool::new(&config());
        let queue = SubpartitionQueue::new(&config());
        let view = Arc::new(queue.create_view().unwrap());

        struct ReleasingListener(Arc<SubpartitionView>);
        impl AvailabilityListener for ReleasingListener {
            fn notify_data_available(&self) {
                self.0.release();
            }
        }
        view.register_listener(Arc::new(ReleasingListener(Arc::clone(&view))))
            .unwrap();
        view.credit_channel().grant_credit(1).unwrap();

        // The append's notification runs the release inline.
        queue.append(pool.acquire().unwrap()).unwrap();
        assert!(view.is_released());
        assert_eq!(pool.free_count(), pool.capacity());
    }
}
