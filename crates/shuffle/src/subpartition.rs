use crate::invariants::{
    debug_assert_backlog_consistent, debug_assert_credit_available, debug_assert_lane_order,
    debug_assert_priority_prefix,
};
use crate::view::{AvailabilityListener, PolledEntry, SubpartitionView};
use crate::{Buffer, ExchangeConfig, ExchangeError, Metrics, MetricsSnapshot};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// =============================================================================
// LOCKING & NOTIFICATION PROTOCOL
// =============================================================================
//
// One producer thread appends to a subpartition; one reader (the transport
// driver) pulls through its view. All shared state for that pair — the entry
// deque, the priority prefix, credit, and lifecycle flags — sits behind a
// single mutex. No lock is shared across subpartitions, so parallel channels
// scale independently.
//
// Listener callbacks are never invoked while the mutex is held. Every
// mutating operation decides *inside* the lock whether a notification is due,
// clones the listener handle, drops the guard, and only then calls out. This
// keeps a re-entrant consumer (one that polls from inside its callback) from
// deadlocking, and makes release/close safe to race with an in-flight
// notification: the late callback finds the state closed and polling returns
// `ChannelClosed` instead of touching freed memory.
//
// Data-availability notification is edge-triggered. `deliverable_notified`
// arms when a notification is handed out and disarms whenever the reader
// observes a non-deliverable queue (empty, or data head at zero credit).
// Duplicate notifications are harmless — the reader re-checks availability —
// but a missed empty→deliverable edge would strand the consumer, so every
// transition point re-evaluates `take_data_notification`.
//
// =============================================================================

/// A control message that overtakes queued data, e.g. a checkpoint barrier.
///
/// The wire encoding of control events is owned by the coordinator; at this
/// layer a priority event is an opaque marker. The submission sequence number
/// used for `notify_priority_event` is assigned by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityEvent {
    marker: u64,
}

impl PriorityEvent {
    /// Creates a priority event carrying the coordinator's marker.
    pub const fn new(marker: u64) -> Self {
        Self { marker }
    }

    /// Returns the coordinator-assigned marker.
    #[inline]
    pub fn marker(&self) -> u64 {
        self.marker
    }
}

/// One element of a subpartition queue: a data buffer or a priority event.
#[derive(Debug)]
pub enum Entry {
    /// Opaque serialized records, subject to credit.
    Data(Buffer),
    /// Credit-exempt control event.
    Priority(PriorityEvent),
}

impl Entry {
    /// Returns `true` for the priority lane.
    #[inline]
    pub fn is_priority(&self) -> bool {
        matches!(self, Self::Priority(_))
    }
}

struct Sequenced {
    entry: Entry,
    sequence: u64,
}

/// Per-(producer, consumer) ordered queue of buffers and priority events.
///
/// The producer appends data at the tail; the checkpoint coordinator splices
/// priority events ahead of all queued data (but behind earlier priority
/// events); the consumer attaches exactly one [`SubpartitionView`] and drains
/// through it, gated by credit.
pub struct SubpartitionQueue {
    shared: Arc<QueueShared>,
}

pub(crate) struct QueueShared {
    state: Mutex<QueueState>,
    max_priority_events: usize,
    enable_metrics: bool,
    metrics: Metrics,
}

struct QueueState {
    entries: VecDeque<Sequenced>,
    /// Length of the priority prefix at the head of `entries`.
    priority_len: usize,
    /// Submission index handed to the next entry.
    next_sequence: u64,
    last_data_sequence: Option<u64>,
    last_priority_sequence: Option<u64>,
    /// Queued data entries, reported downstream for credit batching.
    backlog: usize,
    /// Credit granted by the consumer and not yet spent on data entries.
    credit: u32,
    /// Backlog figure last reported alongside delivered data.
    reported_backlog: usize,
    finished: bool,
    view_created: bool,
    released: bool,
    channel_closed: bool,
    listener: Option<Arc<dyn AvailabilityListener>>,
    /// Edge-trigger arm for `notify_data_available`.
    deliverable_notified: bool,
}

impl QueueState {
    /// A queue is deliverable when polling it would yield an entry: the head
    /// is a priority event (credit exempt) or there is data and credit.
    fn deliverable(&self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.priority_len > 0 || self.credit > 0
    }

    /// Arms the edge trigger and hands out the listener when a
    /// data-availability notification is due.
    fn take_data_notification(&mut self) -> Option<Arc<dyn AvailabilityListener>> {
        if self.deliverable_notified || !self.deliverable() {
            return None;
        }
        let listener = self.listener.clone()?;
        self.deliverable_notified = true;
        Some(listener)
    }

    fn closed(&self) -> bool {
        self.released || self.channel_closed
    }

    fn data_count(&self) -> usize {
        self.entries.len() - self.priority_len
    }

    fn priority_prefix_ok(&self) -> bool {
        self.entries
            .iter()
            .take(self.priority_len)
            .all(|s| s.entry.is_priority())
            && self
                .entries
                .iter()
                .skip(self.priority_len)
                .all(|s| !s.entry.is_priority())
    }

    /// Drops every queued entry; buffers recycle into their pool.
    fn drain(&mut self) {
        self.entries.clear();
        self.priority_len = 0;
        self.backlog = 0;
        self.deliverable_notified = false;
    }
}

impl QueueShared {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------------------------------------------------------------------
    // VIEW-SIDE OPERATIONS (called through SubpartitionView / CreditFlowChannel)
    // ---------------------------------------------------------------------

    pub(crate) fn register_listener(
        &self,
        listener: Arc<dyn AvailabilityListener>,
    ) -> Result<(), ExchangeError> {
        let pending = {
            let mut state = self.lock_state();
            if state.closed() {
                return Err(ExchangeError::ChannelClosed);
            }
            if state.listener.is_some() {
                return Err(ExchangeError::AlreadyRegistered);
            }
            state.listener = Some(listener);
            // Entries queued before the consumer attached must still produce
            // a wakeup, otherwise the first notification edge is lost.
            state.take_data_notification()
        };
        if let Some(listener) = pending {
            listener.notify_data_available();
        }
        Ok(())
    }

    pub(crate) fn poll_next(&self) -> Result<Option<PolledEntry>, ExchangeError> {
        let mut state = self.lock_state();
        if state.closed() {
            return Err(ExchangeError::ChannelClosed);
        }
        if state.entries.is_empty() {
            state.deliverable_notified = false;
            return Ok(None);
        }

        let head_is_priority = state.priority_len > 0;
        if !head_is_priority && state.credit == 0 {
            state.deliverable_notified = false;
            return Ok(None);
        }

        let Some(Sequenced { entry, sequence }) = state.entries.pop_front() else {
            state.deliverable_notified = false;
            return Ok(None);
        };

        if head_is_priority {
            state.priority_len -= 1;
            if let Some(last) = state.last_priority_sequence {
                debug_assert_lane_order!("priority", last, sequence);
                if sequence <= last {
                    return Err(ExchangeError::OrderingViolation {
                        expected: last,
                        actual: sequence,
                    });
                }
            }
            state.last_priority_sequence = Some(sequence);
        } else {
            debug_assert_credit_available!(state.credit);
            state.credit -= 1;
            state.backlog -= 1;
            if let Some(last) = state.last_data_sequence {
                debug_assert_lane_order!("data", last, sequence);
                if sequence <= last {
                    return Err(ExchangeError::OrderingViolation {
                        expected: last,
                        actual: sequence,
                    });
                }
            }
            state.last_data_sequence = Some(sequence);
        }

        debug_assert_priority_prefix!(state.priority_prefix_ok(), state.priority_len);
        debug_assert_backlog_consistent!(state.backlog, state.data_count());

        if !state.deliverable() {
            state.deliverable_notified = false;
        }
        if self.enable_metrics {
            self.metrics.add_entries_delivered(1);
        }

        Ok(Some(PolledEntry {
            entry,
            sequence,
            backlog: state.backlog,
        }))
    }

    /// Releases the consumer view. Idempotent; queued buffers recycle.
    pub(crate) fn release_view(&self) {
        let mut state = self.lock_state();
        if state.released {
            return;
        }
        state.released = true;
        state.drain();
    }

    // ---------------------------------------------------------------------
    // CREDIT-FLOW OPERATIONS
    // ---------------------------------------------------------------------

    pub(crate) fn grant_credit(&self, n: u32) -> Result<(), ExchangeError> {
        let pending = {
            let mut state = self.lock_state();
            if state.closed() {
                return Err(ExchangeError::ChannelClosed);
            }
            if n == 0 {
                return Ok(());
            }
            let was_zero = state.credit == 0;
            state.credit = state.credit.saturating_add(n);
            if self.enable_metrics {
                self.metrics.add_credits_granted(u64::from(n));
            }
            // A 0 → positive transition makes a waiting data head deliverable.
            if was_zero {
                state.take_data_notification()
            } else {
                None
            }
        };
        if let Some(listener) = pending {
            listener.notify_data_available();
        }
        Ok(())
    }

    pub(crate) fn report_backlog(&self, n: usize) {
        self.lock_state().reported_backlog = n;
    }

    pub(crate) fn last_reported_backlog(&self) -> usize {
        self.lock_state().reported_backlog
    }

    pub(crate) fn credit(&self) -> u32 {
        self.lock_state().credit
    }

    /// Closes the channel. Idempotent and terminal; queued buffers recycle.
    pub(crate) fn close_channel(&self) {
        let mut state = self.lock_state();
        if state.channel_closed {
            return;
        }
        state.channel_closed = true;
        state.drain();
    }

    pub(crate) fn is_channel_closed(&self) -> bool {
        self.lock_state().channel_closed
    }

    pub(crate) fn is_released(&self) -> bool {
        self.lock_state().released
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.lock_state().finished
    }

    pub(crate) fn backlog(&self) -> usize {
        self.lock_state().backlog
    }
}

impl SubpartitionQueue {
    /// Creates an empty queue for one (producer, consumer) pair.
    pub fn new(config: &ExchangeConfig) -> Self {
        Self {
            shared: Arc::new(QueueShared {
                state: Mutex::new(QueueState {
                    entries: VecDeque::new(),
                    priority_len: 0,
                    next_sequence: 0,
                    last_data_sequence: None,
                    last_priority_sequence: None,
                    backlog: 0,
                    credit: 0,
                    reported_backlog: 0,
                    finished: false,
                    view_created: false,
                    released: false,
                    channel_closed: false,
                    listener: None,
                    deliverable_notified: false,
                }),
                max_priority_events: config.max_priority_events,
                enable_metrics: config.enable_metrics,
                metrics: Metrics::new(),
            }),
        }
    }

    /// Appends a data buffer at the tail.
    ///
    /// Fires `notify_data_available` on the registered listener exactly once
    /// per empty→deliverable transition. Fails with `ChannelClosed` after
    /// `finish()`, release or close.
    pub fn append(&self, buffer: Buffer) -> Result<(), ExchangeError> {
        let pending = {
            let mut state = self.shared.lock_state();
            if state.closed() || state.finished {
                return Err(ExchangeError::ChannelClosed);
            }
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            state.entries.push_back(Sequenced {
                entry: Entry::Data(buffer),
                sequence,
            });
            state.backlog += 1;

            debug_assert_priority_prefix!(state.priority_prefix_ok(), state.priority_len);
            debug_assert_backlog_consistent!(state.backlog, state.data_count());

            if self.shared.enable_metrics {
                self.shared.metrics.add_entries_appended(1);
            }
            state.take_data_notification()
        };
        if let Some(listener) = pending {
            listener.notify_data_available();
        }
        Ok(())
    }

    /// Splices a priority event ahead of all queued data.
    ///
    /// The event lands after earlier priority events (priority is FIFO within
    /// its own lane) and before every not-yet-delivered data entry. Credit is
    /// not consulted. Returns the submission sequence assigned to the event,
    /// which is also passed to `notify_priority_event` — that callback fires
    /// unconditionally, even at zero credit, so control events reach the
    /// consumer promptly.
    ///
    /// `Err(PriorityOverflow)` once `max_priority_events` are queued and
    /// undelivered; the bound is what keeps the fast path memory-finite, so
    /// the owning task must treat it as fatal.
    pub fn add_priority_event(&self, event: PriorityEvent) -> Result<u64, ExchangeError> {
        let (sequence, listener) = {
            let mut state = self.shared.lock_state();
            if state.closed() || state.finished {
                return Err(ExchangeError::ChannelClosed);
            }
            if state.priority_len >= self.shared.max_priority_events {
                return Err(ExchangeError::PriorityOverflow {
                    max: self.shared.max_priority_events,
                });
            }
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            let at = state.priority_len;
            state.entries.insert(
                at,
                Sequenced {
                    entry: Entry::Priority(event),
                    sequence,
                },
            );
            state.priority_len += 1;

            debug_assert_priority_prefix!(state.priority_prefix_ok(), state.priority_len);
            debug_assert_backlog_consistent!(state.backlog, state.data_count());

            if self.shared.enable_metrics {
                self.shared.metrics.add_priority_events(1);
            }
            let listener = state.listener.clone();
            if listener.is_some() {
                // The priority callback below is the wakeup; suppress a
                // redundant data notification until the reader drains.
                state.deliverable_notified = true;
            }
            (sequence, listener)
        };
        if let Some(listener) = listener {
            listener.notify_priority_event(sequence);
        }
        Ok(sequence)
    }

    /// Marks that no further entries will be appended.
    ///
    /// Idempotent. Fires one final `notify_data_available` so the consumer
    /// drains the remainder and observes end-of-stream.
    pub fn finish(&self) -> Result<(), ExchangeError> {
        let listener = {
            let mut state = self.shared.lock_state();
            if state.closed() {
                return Err(ExchangeError::ChannelClosed);
            }
            if state.finished {
                return Ok(());
            }
            state.finished = true;
            state.listener.clone()
        };
        if let Some(listener) = listener {
            listener.notify_data_available();
        }
        Ok(())
    }

    /// Attaches the single consumer and returns its view.
    ///
    /// A second attachment fails with `AlreadyRegistered`.
    pub fn create_view(&self) -> Result<SubpartitionView, ExchangeError> {
        let mut state = self.shared.lock_state();
        if state.closed() {
            return Err(ExchangeError::ChannelClosed);
        }
        if state.view_created {
            return Err(ExchangeError::AlreadyRegistered);
        }
        state.view_created = true;
        drop(state);
        Ok(SubpartitionView::new(Arc::clone(&self.shared)))
    }

    /// Returns the count of queued, not-yet-delivered data entries.
    pub fn backlog(&self) -> usize {
        self.shared.backlog()
    }

    /// Returns the number of queued entries of both lanes.
    pub fn len(&self) -> usize {
        self.shared.lock_state().entries.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` after `finish()`.
    pub fn is_finished(&self) -> bool {
        self.shared.is_finished()
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.shared.enable_metrics {
            self.shared.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }
}
