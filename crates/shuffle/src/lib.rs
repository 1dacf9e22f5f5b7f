//! Shuffle exchange core — bounded buffers, subpartition queues, credit flow.
//!
//! This crate is the data-exchange layer between a producing task and its
//! downstream consumers: finished records enter as fixed-size buffers leased
//! from a bounded [`BufferPool`], queue per consumer in a
//! [`SubpartitionQueue`], and leave through a [`SubpartitionView`] gated by
//! consumer-granted credit. Control events (checkpoint barriers) take a
//! priority lane that overtakes queued data without consuming credit.
//!
//! # Key Properties
//!
//! - Bounded memory: the pool is the only buffer source; `acquire()` blocking
//!   is the backpressure signal that throttles the whole upstream pipeline
//! - Strict FIFO per lane: data never reorders against data, priority never
//!   reorders against priority; priority may overtake undelivered data
//! - Non-blocking consumer: polling returns "not available" and an
//!   [`AvailabilityListener`] callback announces the next opportunity
//! - Structural buffer safety: RAII handles make leaks and double frees
//!   inexpressible in safe code
//!
//! # Example
//!
//! ```
//! use shuffle_rs::{BufferPool, ExchangeConfig, PriorityEvent, SubpartitionQueue};
//!
//! let config = ExchangeConfig::new(1024, 4, 8, false);
//! let pool = BufferPool::new(&config);
//! let queue = SubpartitionQueue::new(&config);
//! let view = queue.create_view().unwrap();
//! view.credit_channel().grant_credit(2).unwrap();
//!
//! let mut buf = pool.acquire().unwrap();
//! buf.fill_from(b"record");
//! queue.append(buf).unwrap();
//! queue.add_priority_event(PriorityEvent::new(1)).unwrap();
//!
//! // The barrier overtakes the queued record.
//! let first = view.get_next_buffer().unwrap().unwrap();
//! assert!(first.entry.is_priority());
//! ```

mod buffer;
mod config;
mod credit;
mod error;
mod invariants;
mod metrics;
mod pool;
mod subpartition;
mod view;

pub use buffer::{Buffer, BufferKind};
pub use config::{ExchangeConfig, HIGH_THROUGHPUT_CONFIG, LOW_MEMORY_CONFIG};
pub use credit::{CreditFlowChannel, CreditState};
pub use error::ExchangeError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use pool::BufferPool;
pub use subpartition::{Entry, PriorityEvent, SubpartitionQueue};
pub use view::{AvailabilityListener, PolledEntry, SubpartitionView};
