//! Configuration for reader behavior.

use std::time::Duration;

/// Configuration for an async channel reader.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Poll interval for the hybrid polling strategy.
    ///
    /// Even with event-driven notification, this interval acts as a safety
    /// net to catch missed wakeups and batch small bursts.
    ///
    /// Default: 10ms
    pub poll_interval: Duration,

    /// Target batch size for draining the view per wakeup.
    ///
    /// The reader stages up to this many responses per poll to improve
    /// throughput via batching.
    ///
    /// Default: 64
    pub batch_hint: usize,

    /// Credit announced to the producer at attach time.
    ///
    /// Two exclusive buffers per channel keep the pipeline moving before the
    /// first backlog report arrives; zero is valid and means the first data
    /// entry waits for an explicit grant.
    ///
    /// Default: 2
    pub initial_credit: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            batch_hint: 64,
            initial_credit: 2,
        }
    }
}

impl ReaderConfig {
    /// Creates a low-latency configuration with a shorter poll interval.
    pub fn low_latency() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            batch_hint: 16,
            initial_credit: 2,
        }
    }

    /// Creates a high-throughput configuration with larger batches.
    pub fn high_throughput() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            batch_hint: 256,
            initial_credit: 8,
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the batch hint.
    pub fn with_batch_hint(mut self, hint: usize) -> Self {
        self.batch_hint = hint;
        self
    }

    /// Sets the initial credit.
    pub fn with_initial_credit(mut self, credit: u32) -> Self {
        self.initial_credit = credit;
        self
    }
}
