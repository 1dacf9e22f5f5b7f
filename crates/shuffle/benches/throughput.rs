//! Criterion benchmarks for the append → poll hot path.

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use shuffle_rs::{BufferPool, ExchangeConfig, PriorityEvent, SubpartitionQueue};

fn bench_append_poll(c: &mut Criterion) {
    let config = ExchangeConfig::new(1024, 256, 128, false);

    let mut group = c.benchmark_group("exchange");
    group.throughput(Throughput::Elements(1));

    group.bench_function("append_poll_data", |b| {
        let pool = BufferPool::new(&config);
        let queue = SubpartitionQueue::new(&config);
        let view = queue.create_view().unwrap();
        let channel = view.credit_channel();
        channel.grant_credit(u32::MAX).unwrap();

        b.iter(|| {
            let mut buf = pool.acquire().unwrap();
            buf.fill_from(b"0123456789abcdef");
            queue.append(buf).unwrap();
            let polled = view.get_next_buffer().unwrap().unwrap();
            std::hint::black_box(polled);
        });
    });

    group.bench_function("priority_splice_over_backlog", |b| {
        let pool = BufferPool::new(&config);
        let queue = SubpartitionQueue::new(&config);
        let view = queue.create_view().unwrap();
        view.credit_channel().grant_credit(u32::MAX).unwrap();

        // Keep a standing data backlog the barrier must overtake.
        for _ in 0..64 {
            let mut buf = pool.acquire().unwrap();
            buf.fill_from(b"payload");
            queue.append(buf).unwrap();
        }

        let mut marker = 0u64;
        b.iter(|| {
            marker += 1;
            queue.add_priority_event(PriorityEvent::new(marker)).unwrap();
            let polled = view.get_next_buffer().unwrap().unwrap();
            std::hint::black_box(polled);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_append_poll);
criterion_main!(benches);
