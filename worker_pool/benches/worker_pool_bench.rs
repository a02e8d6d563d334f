// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use worker_pool::{Task, WorkerPool};

fn bench_submit_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_all");
    for workers in [1, 4, 8] {
        group.throughput(Throughput::Elements(100));
        group.bench_with_input(
            BenchmarkId::from_parameter(workers),
            &workers,
            |b, &workers| {
                let pool = WorkerPool::new(workers).unwrap();
                let counter = Arc::new(AtomicU64::new(0));
                b.iter(|| {
                    let tasks: Vec<Task> = (0..100)
                        .map(|_| {
                            let counter = Arc::clone(&counter);
                            Box::new(move || {
                                counter.fetch_add(1, Ordering::Relaxed);
                            }) as Task
                        })
                        .collect();
                    pool.submit_all(tasks).unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_submit_all);
criterion_main!(benches);
