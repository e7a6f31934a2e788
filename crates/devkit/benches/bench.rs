use core::convert::Infallible;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use devkit::{Dispatcher, ThreadPool};
use std::hint::black_box;
use std::sync::Arc;

// Total number of items per benchmark iteration
const TOTAL_ITEMS: usize = 64 * 1024;

const BATCH_SIZE: usize = 512;

fn busy_sum(batch: &[u64]) -> Result<u64, Infallible> {
    Ok(batch.iter().map(|x| black_box(x.wrapping_mul(*x))).sum())
}

fn worker_counts() -> Vec<usize> {
    let max = num_cpus::get().max(1);
    let mut counts: Vec<usize> = [1, 2, 4, 8, 16]
        .into_iter()
        .filter(|&n| n <= max)
        .collect();
    if counts.last() != Some(&max) {
        counts.push(max);
    }
    counts
}

/// Batched dispatch, ordered vs unordered delivery, across worker counts
fn bench_batch_handle(c: &mut Criterion) {
    let items: Arc<[u64]> = (0..TOTAL_ITEMS as u64).collect();
    let mut group = c.benchmark_group("dispatch/batch");
    group.throughput(Throughput::Elements(TOTAL_ITEMS as u64));

    for workers in worker_counts() {
        let pool = ThreadPool::with_name(workers, "bench").expect("pool");
        let dispatcher = Dispatcher::new(&pool);

        group.bench_function(format!("ordered/workers/{workers}"), |b| {
            b.iter(|| {
                let mut total = 0u64;
                dispatcher
                    .batch_handle(Arc::clone(&items), BATCH_SIZE, busy_sum, |s| {
                        total = total.wrapping_add(s)
                    })
                    .expect("dispatch");
                black_box(total)
            });
        });

        group.bench_function(format!("unordered/workers/{workers}"), |b| {
            b.iter(|| {
                let mut total = 0u64;
                dispatcher
                    .batch_handle_unordered(Arc::clone(&items), BATCH_SIZE, busy_sum, |s| {
                        total = total.wrapping_add(s)
                    })
                    .expect("dispatch");
                black_box(total)
            });
        });
    }

    group.finish();
}

/// Per-item dispatch: one job per item, dominated by queue overhead
fn bench_handle(c: &mut Criterion) {
    const ITEMS: usize = 4096;
    let items: Arc<[u64]> = (0..ITEMS as u64).collect();
    let mut group = c.benchmark_group("dispatch/item");
    group.throughput(Throughput::Elements(ITEMS as u64));

    for workers in worker_counts() {
        let pool = ThreadPool::with_name(workers, "bench").expect("pool");
        let dispatcher = Dispatcher::new(&pool);

        group.bench_function(format!("ordered/workers/{workers}"), |b| {
            b.iter(|| {
                dispatcher
                    .handle(
                        Arc::clone(&items),
                        |x: &u64| Ok::<_, Infallible>(x * x),
                        |sq| {
                            black_box(sq);
                        },
                    )
                    .expect("dispatch");
            });
        });

        group.bench_function(format!("unordered/workers/{workers}"), |b| {
            b.iter(|| {
                dispatcher
                    .handle_unordered(
                        Arc::clone(&items),
                        |x: &u64| Ok::<_, Infallible>(x * x),
                        |sq| {
                            black_box(sq);
                        },
                    )
                    .expect("dispatch");
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_batch_handle, bench_handle);
criterion_main!(benches);
