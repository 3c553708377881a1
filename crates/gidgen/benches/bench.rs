use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::future::try_join_all;
use gidgen::{BufferConfig, BufferedGenerator, MonotonicClock, SnowflakeConfig, TimeSource};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};
use tokio::runtime::Builder;

struct FixedMockTime {
    millis: i64,
}

impl TimeSource<i64> for FixedMockTime {
    fn current_millis(&self) -> i64 {
        self.millis
    }
}

// Number of IDs generated per benchmark iteration (per-thread or per-task
// for the contended cases).
const TOTAL_IDS: usize = 4096;

/// Single Snowflake node, single thread, on a fixed clock. Each node issues
/// at most `seq_mask` ids, so the sequence never wraps and the hot path is
/// all that is measured.
fn benchmark_mock_sequential_snowflake(c: &mut Criterion) {
    let mut group = c.benchmark_group("mock/sequential/snowflake");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{}", TOTAL_IDS), |b| {
        b.iter_custom(|iters| {
            let config = SnowflakeConfig::default();
            let start = Instant::now();

            for i in 0..iters {
                let node = config.spawn_node_with_clock(
                    Some(1),
                    FixedMockTime {
                        millis: config.epoch() + i as i64,
                    },
                );
                for _ in 0..TOTAL_IDS.min(config.seq_mask() as usize) {
                    black_box(node.next_id());
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Single Snowflake node shared by a number of threads.
fn benchmark_mono_threaded_snowflake(c: &mut Criterion) {
    let mut group = c.benchmark_group("mono/threaded/snowflake");

    for thread_count in [1, 2, 4, 8] {
        let total_ids = TOTAL_IDS * thread_count;
        group.throughput(Throughput::Elements(total_ids as u64));

        group.bench_function(
            format!("elems/{}/threads/{}", total_ids, thread_count),
            |b| {
                b.iter_custom(|iters| {
                    let node = SnowflakeConfig::default()
                        .spawn_node_with_clock(Some(1), MonotonicClock::default());
                    let barrier = Barrier::new(thread_count + 1);

                    scope(|s| {
                        let shared = &node;
                        let barrier = &barrier;
                        for _ in 0..thread_count {
                            s.spawn(move || {
                                barrier.wait();
                                for _ in 0..iters {
                                    for _ in 0..TOTAL_IDS {
                                        black_box(shared.next_id());
                                    }
                                }
                            });
                        }

                        let start = Instant::now();
                        barrier.wait();
                        start
                    })
                    .elapsed()
                });
            },
        );
    }

    group.finish();
}

/// One buffered generator drained from a single task, counter fallback.
fn benchmark_sequential_buffered(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokio/sequential/buffered");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    for capacity in [64, 1000, 4096] {
        group.bench_function(
            format!("elems/{}/capacity/{}", TOTAL_IDS, capacity),
            |b| {
                let rt = Builder::new_multi_thread()
                    .enable_all()
                    .worker_threads(2)
                    .build()
                    .unwrap();

                b.to_async(&rt).iter_custom(|iters| async move {
                    let generator: BufferedGenerator =
                        BufferedGenerator::new(BufferConfig::new(capacity, None));
                    generator.start().await.unwrap();

                    let start = Instant::now();
                    for _ in 0..iters {
                        for _ in 0..TOTAL_IDS {
                            black_box(generator.next().await.unwrap());
                        }
                    }
                    start.elapsed()
                });
            },
        );
    }

    group.finish();
}

/// One buffered generator shared by a number of Tokio tasks.
fn benchmark_contended_buffered(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokio/contended/buffered");

    for task_count in [2, 8, 32] {
        let total_ids = TOTAL_IDS * task_count;
        group.throughput(Throughput::Elements(total_ids as u64));

        group.bench_function(
            format!("elems/{}/tasks/{}", total_ids, task_count),
            |b| {
                let rt = Builder::new_multi_thread()
                    .enable_all()
                    .worker_threads(4)
                    .build()
                    .unwrap();

                b.to_async(&rt).iter_custom(|iters| async move {
                    let generator: Arc<BufferedGenerator> =
                        Arc::new(BufferedGenerator::new(BufferConfig::default()));
                    generator.start().await.unwrap();

                    let start = Instant::now();
                    for _ in 0..iters {
                        let tasks: Vec<_> = (0..task_count)
                            .map(|_| {
                                let generator = Arc::clone(&generator);
                                tokio::spawn(async move {
                                    for _ in 0..TOTAL_IDS {
                                        black_box(generator.next().await.unwrap());
                                    }
                                })
                            })
                            .collect();
                        try_join_all(tasks).await.unwrap();
                    }
                    start.elapsed()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_mock_sequential_snowflake,
    benchmark_mono_threaded_snowflake,
    benchmark_sequential_buffered,
    benchmark_contended_buffered,
);
criterion_main!(benches);
