//! Async Transport Driver for shuffle-rs
//!
//! This crate drives a [`shuffle_rs::SubpartitionQueue`] on behalf of the
//! transport layer: it attaches the consumer view, listens for availability,
//! and exposes the outbound flow as a [`futures::Stream`] of
//! [`BufferResponse`] messages, applying the consumer's `AddCredit` and
//! `CloseChannel` messages on the way back.
//!
//! # Features
//!
//! - **Hybrid polling**: event-driven via `Notify` + configurable poll
//!   interval as safety net
//! - **Credit flow**: every response carries the upstream backlog so the
//!   consumer can grant credit in batches
//! - **Priority fast path**: control events wake the reader even at zero
//!   credit, with their sequence observable via `take_priority_sequence`
//! - **Clean teardown**: close releases queued and staged buffers back to
//!   the pool before the stream ends
//!
//! # Example
//!
//! ```ignore
//! use shuffle_rs::{BufferPool, ExchangeConfig, SubpartitionQueue};
//! use shuffle_stream::{AddCredit, ChannelId, ChannelReader, ReaderConfig, StreamExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ExchangeConfig::default();
//!     let pool = BufferPool::new(&config);
//!     let queue = SubpartitionQueue::new(&config);
//!     let mut reader =
//!         ChannelReader::attach(&queue, ChannelId(0), ReaderConfig::default()).unwrap();
//!
//!     let mut buf = pool.acquire().unwrap();
//!     buf.fill_from(b"record");
//!     queue.append(buf).unwrap();
//!     queue.finish().unwrap();
//!
//!     while let Some(response) = reader.next().await {
//!         println!("deliver seq={} backlog={}", response.sequence_number, response.backlog);
//!         reader
//!             .on_add_credit(AddCredit { channel_id: reader.channel_id(), num_credits: 1 })
//!             .ok();
//!     }
//! }
//! ```

mod config;
mod error;
mod invariants;
mod listener;
mod messages;
mod reader;

pub use config::ReaderConfig;
pub use error::TransportError;
pub use listener::NotifyListener;
pub use messages::{AddCredit, BufferResponse, ChannelId, CloseChannel};
pub use reader::ChannelReader;

// Re-export useful stream combinators
pub use tokio_stream::StreamExt;
