//! Tracking engine benchmarks
//!
//! Measures the hot paths: cached reads, tracked reads that record edges,
//! invalidation fan-out, and scheduler drains.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use weft_core::{Computed, List, Record, Scheduler, Signal, Value};

// =============================================================================
// Reads
// =============================================================================

fn bench_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("reads");

    group.bench_function("cached_computed", |b| {
        let source = Signal::new(1);
        let reader = source.clone();
        let node = Computed::new(move || reader.get() * 2);
        node.get().ok();

        b.iter(|| black_box(node.get().ok()));
    });

    group.bench_function("untracked_facade_field", |b| {
        let record = Record::from_fields([("a", 1)]).instrument();
        b.iter(|| black_box(record.get("a")));
    });

    for size in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("recompute_list_sum", size), &size, |b, &size| {
            let list = List::from_values((0..size as i64).map(Value::from)).instrument();
            let reader = list.clone();
            let sum = Computed::new(move || reader.values().iter().filter_map(Value::as_int).sum::<i64>());

            b.iter(|| {
                list.set(0, Value::from(black_box(1))).ok();
                black_box(sum.get().ok())
            });
        });
    }

    group.finish();
}

// =============================================================================
// Invalidation
// =============================================================================

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for width in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("signal_write", width), &width, |b, &width| {
            let source = Signal::new(0i64);
            let nodes: Vec<_> = (0..width)
                .map(|_| {
                    let reader = source.clone();
                    Computed::new(move || reader.get() + 1)
                })
                .collect();

            let mut next = 0i64;
            b.iter(|| {
                for node in &nodes {
                    node.get().ok();
                }
                next += 1;
                source.set(black_box(next));
            });
        });
    }

    group.finish();
}

// =============================================================================
// Scheduler
// =============================================================================

fn bench_scheduler(c: &mut Criterion) {
    c.bench_function("scheduler/enqueue_flush_100", |b| {
        b.iter(|| {
            for i in 0..100 {
                Scheduler::enqueue(move || {
                    black_box(i);
                });
            }
            black_box(Scheduler::flush())
        });
    });
}

criterion_group!(benches, bench_reads, bench_fan_out, bench_scheduler);
criterion_main!(benches);
