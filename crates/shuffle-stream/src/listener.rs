//! Availability listener bridging the sync exchange to the async driver.

use shuffle_rs::AvailabilityListener;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// [`AvailabilityListener`] that wakes an async reader through a
/// [`tokio::sync::Notify`].
///
/// `Notify` stores a permit when nobody is waiting, so a notification that
/// races ahead of the reader's registration is not lost — the next
/// `notified()` completes immediately.
///
/// Priority notifications additionally record the event's sequence number in
/// a mailbox the driver can consume to fast-path control events.
#[derive(Debug, Default)]
pub struct NotifyListener {
    notify: Notify,
    priority_pending: AtomicBool,
    priority_sequence: AtomicU64,
}

impl NotifyListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the future that resolves on the next notification.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }

    /// Takes the most recent priority sequence, if one arrived since the
    /// last call.
    pub fn take_priority_sequence(&self) -> Option<u64> {
        if self.priority_pending.swap(false, Ordering::AcqRel) {
            Some(self.priority_sequence.load(Ordering::Acquire))
        } else {
            None
        }
    }
}

impl AvailabilityListener for NotifyListener {
    fn notify_data_available(&self) {
        self.notify.notify_one();
    }

    fn notify_priority_event(&self, sequence: u64) {
        self.priority_sequence.store(sequence, Ordering::Release);
        self.priority_pending.store(true, Ordering::Release);
        tracing::trace!(sequence, "priority event at queue head");
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuffle_rs::AvailabilityListener;

    #[tokio::test]
    async fn test_notification_before_wait_is_not_lost() {
        let listener = NotifyListener::new();
        listener.notify_data_available();
        // The stored permit resolves the wait immediately.
        listener.notified().await;
    }

    #[test]
    fn test_priority_mailbox_take_semantics() {
        let listener = NotifyListener::new();
        assert_eq!(listener.take_priority_sequence(), None);

        listener.notify_priority_event(41);
        listener.notify_priority_event(42);
        assert_eq!(listener.take_priority_sequence(), Some(42));
        assert_eq!(listener.take_priority_sequence(), None);
    }
}
