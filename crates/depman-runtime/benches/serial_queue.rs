//! Serial Task Queue Benchmarks
//!
//! Measures the cost of enqueueing and draining small tasks, both from a
//! single producer and from several producers racing to drain.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use depman_runtime::SerialTaskQueue;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

// ============================================================================
// Single producer
// ============================================================================

fn bench_enqueue_then_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue_then_drain");

    for batch in [1usize, 16, 256] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            let queue = SerialTaskQueue::new("bench");
            let counter = Arc::new(AtomicU64::new(0));
            b.iter(|| {
                for _ in 0..batch {
                    let counter = counter.clone();
                    queue.enqueue(move || {
                        counter.fetch_add(1, Ordering::Relaxed);
                    });
                }
                black_box(queue.run_pending())
            });
        });
    }

    group.finish();
}

fn bench_enqueue_and_drain_each(c: &mut Criterion) {
    let queue = SerialTaskQueue::new("bench");

    c.bench_function("enqueue_and_drain_each", |b| {
        b.iter(|| {
            queue.enqueue(|| {
                black_box(1 + 1);
            });
            black_box(queue.run_pending())
        });
    });
}

// ============================================================================
// Contended producers
// ============================================================================

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");
    let tasks_per_thread = 200u64;

    for threads in [2u64, 4, 8] {
        group.throughput(Throughput::Elements(threads * tasks_per_thread));
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let queue = Arc::new(SerialTaskQueue::new("bench"));
                    let counter = Arc::new(AtomicU64::new(0));
                    let handles: Vec<_> = (0..threads)
                        .map(|_| {
                            let queue = queue.clone();
                            let counter = counter.clone();
                            thread::spawn(move || {
                                for _ in 0..tasks_per_thread {
                                    let counter = counter.clone();
                                    queue.enqueue(move || {
                                        counter.fetch_add(1, Ordering::Relaxed);
                                    });
                                    queue.run_pending();
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    black_box(counter.load(Ordering::Relaxed))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_enqueue_then_drain,
    bench_enqueue_and_drain_each,
    bench_contended
);
criterion_main!(benches);
