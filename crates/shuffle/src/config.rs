/// Configuration for `BufferPool` and `SubpartitionQueue`.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeConfig {
    /// Size of each pooled segment in bytes (default: 32 KiB)
    pub buffer_bytes: usize,
    /// Logical pool capacity in segments; the memory manager resizes it later
    pub pool_capacity: usize,
    /// Maximum undelivered priority events per subpartition
    pub max_priority_events: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl ExchangeConfig {
    /// Creates a new configuration with custom settings.
    pub const fn new(
        buffer_bytes: usize,
        pool_capacity: usize,
        max_priority_events: usize,
        enable_metrics: bool,
    ) -> Self {
        Self {
            buffer_bytes,
            pool_capacity,
            max_priority_events,
            enable_metrics,
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            buffer_bytes: 32 * 1024,
            pool_capacity: 64,
            max_priority_events: 128,
            enable_metrics: false,
        }
    }
}

/// Low memory configuration (4 KiB segments, 8-segment pool)
pub const LOW_MEMORY_CONFIG: ExchangeConfig = ExchangeConfig::new(4 * 1024, 8, 32, false);

/// High throughput configuration (64 KiB segments, 256-segment pool)
pub const HIGH_THROUGHPUT_CONFIG: ExchangeConfig = ExchangeConfig::new(64 * 1024, 256, 128, false);
