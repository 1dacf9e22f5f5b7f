//! Loopback demo: a producer thread pushing through a tiny pool, a priority
//! event overtaking the backlog, and a consumer granting credit in
//! backlog-sized batches.
//!
//! Run with: `cargo run -p shuffle-stream --bin demo`

use shuffle_rs::{BufferPool, Entry, ExchangeConfig, PriorityEvent, SubpartitionQueue};
use shuffle_stream::{AddCredit, ChannelId, ChannelReader, ReaderConfig, StreamExt};
use std::thread;

const RECORDS: usize = 24;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Four segments only, so the producer visibly stalls whenever the
    // consumer falls behind.
    let config = ExchangeConfig::new(256, 4, 16, true);
    let pool = BufferPool::new(&config);
    let queue = SubpartitionQueue::new(&config);

    let channel_id = ChannelId(1);
    let mut reader = ChannelReader::attach(
        &queue,
        channel_id,
        ReaderConfig::default().with_initial_credit(2),
    )
    .expect("attach failed");

    let producer = {
        let pool = pool.clone();
        thread::spawn(move || {
            for i in 0..RECORDS {
                // Blocks here once all four segments are in flight.
                let mut buf = pool.acquire().expect("pool destroyed");
                let payload = format!("record-{i:02}");
                buf.fill_from(payload.as_bytes());
                queue.append(buf).expect("append failed");

                if i % 8 == 7 {
                    let barrier = (i / 8 + 1) as u64;
                    let seq = queue
                        .add_priority_event(PriorityEvent::new(barrier))
                        .expect("priority splice failed");
                    println!("[coordinator] barrier {barrier} spliced at seq {seq}");
                }
            }
            queue.finish().expect("finish failed");
            println!("[producer] finished after {RECORDS} records");
            queue.metrics()
        })
    };

    let mut freed = 0u32;
    while let Some(response) = reader.next().await {
        match response.payload {
            Entry::Priority(event) => {
                println!(
                    "[consumer] barrier {} (seq {}) overtook {} queued records",
                    event.marker(),
                    response.sequence_number,
                    response.backlog
                );
            }
            Entry::Data(buffer) => {
                println!(
                    "[consumer] {} (seq {}, backlog {})",
                    String::from_utf8_lossy(buffer.data()),
                    response.sequence_number,
                    response.backlog
                );
                drop(buffer); // segment returns to the pool here
                freed += 1;
            }
        }

        // Grant in batches sized off the reported backlog instead of one
        // round-trip per buffer. The cap stays at the initial credit so the
        // grant threshold is always reachable.
        let batch = (response.backlog as u32).clamp(1, 2);
        if freed >= batch {
            reader
                .on_add_credit(AddCredit {
                    channel_id,
                    num_credits: freed,
                })
                .expect("credit grant failed");
            freed = 0;
        }
    }

    let queue_metrics = producer.join().expect("producer panicked");
    let pool_metrics = pool.metrics();
    println!(
        "[done] appended={} delivered={} barriers={} credits={} acquires={} stalls={}",
        queue_metrics.entries_appended,
        queue_metrics.entries_delivered,
        queue_metrics.priority_events,
        queue_metrics.credits_granted,
        pool_metrics.buffers_acquired,
        pool_metrics.acquire_waits
    );
    assert_eq!(pool.free_count(), pool.capacity(), "buffer leak");
}
