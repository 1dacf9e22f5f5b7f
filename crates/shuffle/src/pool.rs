use crate::invariants::debug_assert_pool_accounting;
use crate::{Buffer, ExchangeConfig, ExchangeError, Metrics, MetricsSnapshot};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Bounded pool of reusable fixed-size memory segments.
///
/// The pool is the sole source of backpressure in the exchange: when no
/// segment is free, `acquire()` suspends the producer thread until a consumer
/// release makes one available. Nothing else in the exchange ever blocks.
///
/// Capacity is logical and owned by an external memory manager: `resize()`
/// grows eagerly but shrinks lazily — a leased segment is never reclaimed by
/// force, it is simply dropped instead of recycled once its `Buffer` handle
/// is released.
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

pub(crate) struct PoolShared {
    buffer_bytes: usize,
    enable_metrics: bool,
    metrics: Metrics,
    state: Mutex<PoolState>,
    available: Condvar,
}

struct PoolState {
    /// Segments currently available for lease.
    free: Vec<Box<[u8]>>,
    /// Segments currently held by `Buffer` handles.
    leased: usize,
    /// Segments in existence (free + leased). Converges to `capacity`.
    total: usize,
    /// Logical capacity as set by the memory manager.
    capacity: usize,
    destroyed: bool,
}

impl PoolShared {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        // Poisoning cannot leave the accounting inconsistent: every mutation
        // below upholds INV-POOL-01 before any early return.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a leased segment to the pool. Called from `Buffer::drop`.
    pub(crate) fn recycle(&self, segment: Box<[u8]>) {
        let mut state = self.lock_state();
        state.leased -= 1;

        if state.destroyed || state.free.len() + state.leased >= state.capacity {
            // Excess segment after a shrink (or teardown): drop instead of recycle.
            state.total -= 1;
            drop(segment);
        } else {
            state.free.push(segment);
            self.available.notify_one();
        }

        debug_assert_pool_accounting!(state.free.len(), state.leased, state.total);

        if self.enable_metrics {
            self.metrics.add_buffers_recycled(1);
        }
    }
}

impl BufferPool {
    /// Creates a pool of `config.pool_capacity` segments of
    /// `config.buffer_bytes` bytes each, all allocated up front.
    pub fn new(config: &ExchangeConfig) -> Self {
        let capacity = config.pool_capacity;
        let mut free = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            free.push(zeroed_segment(config.buffer_bytes));
        }

        Self {
            shared: Arc::new(PoolShared {
                buffer_bytes: config.buffer_bytes,
                enable_metrics: config.enable_metrics,
                metrics: Metrics::new(),
                state: Mutex::new(PoolState {
                    free,
                    leased: 0,
                    total: capacity,
                    capacity,
                    destroyed: false,
                }),
                available: Condvar::new(),
            }),
        }
    }

    /// Leases a segment, blocking until one is free.
    ///
    /// This is the backpressure point: a slow consumer keeps segments leased,
    /// the free list drains, and the producer thread parks here until a
    /// release occurs. Returns `Err(ChannelClosed)` if the pool is destroyed
    /// while waiting.
    pub fn acquire(&self) -> Result<Buffer, ExchangeError> {
        let mut state = self.shared.lock_state();
        loop {
            if state.destroyed {
                return Err(ExchangeError::ChannelClosed);
            }
            if let Some(segment) = state.free.pop() {
                state.leased += 1;
                debug_assert_pool_accounting!(state.free.len(), state.leased, state.total);
                if self.shared.enable_metrics {
                    self.shared.metrics.add_buffers_acquired(1);
                }
                return Ok(Buffer::lease(segment, Arc::clone(&self.shared)));
            }
            if self.shared.enable_metrics {
                self.shared.metrics.add_acquire_waits(1);
            }
            state = self
                .shared
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Leases a segment without blocking.
    ///
    /// `Err(ResourceExhausted)` is the retry-later signal, not a failure.
    pub fn try_acquire(&self) -> Result<Buffer, ExchangeError> {
        let mut state = self.shared.lock_state();
        if state.destroyed {
            return Err(ExchangeError::ChannelClosed);
        }
        if let Some(segment) = state.free.pop() {
            state.leased += 1;
            debug_assert_pool_accounting!(state.free.len(), state.leased, state.total);
            if self.shared.enable_metrics {
                self.shared.metrics.add_buffers_acquired(1);
            }
            Ok(Buffer::lease(segment, Arc::clone(&self.shared)))
        } else {
            Err(ExchangeError::ResourceExhausted)
        }
    }

    /// Adjusts the logical capacity.
    ///
    /// Growing allocates the missing segments immediately and wakes all
    /// suspended acquirers. Shrinking drops free segments at once; leased
    /// segments are dropped lazily as their handles are released.
    pub fn resize(&self, new_capacity: usize) {
        let mut state = self.shared.lock_state();
        if state.destroyed {
            return;
        }
        state.capacity = new_capacity;

        while state.total < new_capacity {
            state.free.push(zeroed_segment(self.shared.buffer_bytes));
            state.total += 1;
        }
        while state.total > new_capacity {
            if state.free.pop().is_none() {
                break; // remainder is leased; reclaimed lazily on release
            }
            state.total -= 1;
        }

        debug_assert_pool_accounting!(state.free.len(), state.leased, state.total);
        self.shared.available.notify_all();
    }

    /// Destroys the pool. Idempotent.
    ///
    /// Frees all idle segments, wakes every suspended acquirer with
    /// `ChannelClosed`, and causes still-leased buffers to be dropped rather
    /// than recycled when they are released.
    pub fn destroy(&self) {
        let mut state = self.shared.lock_state();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        state.total -= state.free.len();
        state.free.clear();
        debug_assert_pool_accounting!(state.free.len(), state.leased, state.total);
        self.shared.available.notify_all();
    }

    /// Returns the logical capacity.
    pub fn capacity(&self) -> usize {
        self.shared.lock_state().capacity
    }

    /// Returns the number of free segments.
    pub fn free_count(&self) -> usize {
        self.shared.lock_state().free.len()
    }

    /// Returns the number of leased segments.
    pub fn leased_count(&self) -> usize {
        self.shared.lock_state().leased
    }

    /// Returns the segment size in bytes.
    pub fn buffer_bytes(&self) -> usize {
        self.shared.buffer_bytes
    }

    /// Returns `true` once `destroy()` has been called.
    pub fn is_destroyed(&self) -> bool {
        self.shared.lock_state().destroyed
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

impl Clone for BufferPool {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

fn zeroed_segment(bytes: usize) -> Box<[u8]> {
    vec![0u8; bytes].into_boxed_slice()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(capacity: usize) -> ExchangeConfig {
        ExchangeConfig::new(64, capacity, 8, true)
    }

    #[test]
    fn test_acquire_release_accounting() {
        let pool = BufferPool::new(&small_config(4));
        assert_eq!(pool.free_count(), 4);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!(pool.free_count(), 2);
        assert_eq!(pool.leased_count(), 2);

        drop(a);
        assert_eq!(pool.free_count(), 3);
        assert_eq!(pool.leased_count(), 1);

        drop(b);
        assert_eq!(pool.free_count(), 4);
        assert_eq!(pool.leased_count(), 0);

        let m = pool.metrics();
        assert_eq!(m.buffers_acquired, 2);
        assert_eq!(m.buffers_recycled, 2);
    }

    #[test]
    fn test_try_acquire_exhausted() {
        let pool = BufferPool::new(&small_config(1));
        let held = pool.try_acquire().unwrap();

        let err = pool.try_acquire().unwrap_err();
        assert_eq!(err, ExchangeError::ResourceExhausted);
        assert!(err.is_recoverable());

        drop(held);
        assert!(pool.try_acquire().is_ok());
    }

    #[test]
    fn test_blocking_acquire_wakes_on_release() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let pool = BufferPool::new(&small_config(1));
        let held = pool.acquire().unwrap();

        let (tx, rx) = mpsc::channel();
        let pool2 = pool.clone();
        let waiter = thread::spawn(move || {
            let buf = pool2.acquire().unwrap();
            tx.send(()).unwrap();
            drop(buf);
        });

        // The waiter must still be parked while the segment is leased.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        drop(held);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_resize_grow_and_lazy_shrink() {
        let pool = BufferPool::new(&small_config(2));
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();

        pool.resize(4);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.free_count(), 2);

        // Shrink below the leased count: nothing to reclaim eagerly.
        pool.resize(1);
        assert_eq!(pool.free_count(), 0);
        assert_eq!(pool.leased_count(), 2);

        // Releases observe the shrink lazily: first release is dropped,
        // second recycles into the single remaining slot.
        drop(a);
        assert_eq!(pool.free_count(), 0);
        drop(b);
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.leased_count(), 0);
    }

    #[test]
    fn test_destroy_wakes_waiters() {
        use std::thread;

        let pool = BufferPool::new(&small_config(1));
        let held = pool.acquire().unwrap();

        let pool2 = pool.clone();
        let waiter = thread::spawn(move || pool2.acquire());

        thread::sleep(std::time::Duration::from_millis(20));
        pool.destroy();

        assert_eq!(waiter.join().unwrap(), Err(ExchangeError::ChannelClosed));
        assert!(pool.is_destroyed());

        // Late release after destroy drops the segment instead of recycling.
        drop(held);
        assert_eq!(pool.free_count(), 0);
        assert_eq!(pool.leased_count(), 0);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let pool = BufferPool::new(&small_config(2));
        pool.destroy();
        pool.destroy();
        assert_eq!(pool.acquire().unwrap_err(), ExchangeError::ChannelClosed);
    }
}
