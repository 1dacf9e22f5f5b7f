use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for exchange monitoring.
///
/// Counters are cache-padded so that producer-side and consumer-side updates
/// do not share lines. Collection is gated by `ExchangeConfig::enable_metrics`
/// at the call sites, so a disabled pool or queue pays nothing on the hot path.
#[derive(Debug, Default)]
pub struct Metrics {
    buffers_acquired: CachePadded<AtomicU64>,
    buffers_recycled: CachePadded<AtomicU64>,
    acquire_waits: CachePadded<AtomicU64>,
    entries_appended: CachePadded<AtomicU64>,
    entries_delivered: CachePadded<AtomicU64>,
    priority_events: CachePadded<AtomicU64>,
    credits_granted: CachePadded<AtomicU64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_buffers_acquired(&self, n: u64) {
        self.buffers_acquired.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_buffers_recycled(&self, n: u64) {
        self.buffers_recycled.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_acquire_waits(&self, n: u64) {
        self.acquire_waits.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_entries_appended(&self, n: u64) {
        self.entries_appended.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_entries_delivered(&self, n: u64) {
        self.entries_delivered.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_priority_events(&self, n: u64) {
        self.priority_events.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_credits_granted(&self, n: u64) {
        self.credits_granted.fetch_add(n, Ordering::Relaxed);
    }

    /// Returns a consistent-enough snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            buffers_acquired: self.buffers_acquired.load(Ordering::Relaxed),
            buffers_recycled: self.buffers_recycled.load(Ordering::Relaxed),
            acquire_waits: self.acquire_waits.load(Ordering::Relaxed),
            entries_appended: self.entries_appended.load(Ordering::Relaxed),
            entries_delivered: self.entries_delivered.load(Ordering::Relaxed),
            priority_events: self.priority_events.load(Ordering::Relaxed),
            credits_granted: self.credits_granted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub buffers_acquired: u64,
    pub buffers_recycled: u64,
    pub acquire_waits: u64,
    pub entries_appended: u64,
    pub entries_delivered: u64,
    pub priority_events: u64,
    pub credits_granted: u64,
}
