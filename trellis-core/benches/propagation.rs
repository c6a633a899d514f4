//! Benchmarks for trellis-core
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis_core::graph::{untracked, Consumer};
use trellis_core::reactive::{cached, effect, Signal};
use trellis_core::scheduler::{ManualScheduler, Scheduler};

// =============================================================================
// SIGNAL BENCHMARKS
// =============================================================================

fn bench_signal_create(c: &mut Criterion) {
    c.bench_function("signal_create", |b| b.iter(|| black_box(Signal::new(0i32))));
}

fn bench_signal_read_tracked(c: &mut Criterion) {
    let s = Signal::new(42i32);
    let consumer = Consumer::new();
    c.bench_function("signal_read_tracked", |b| {
        b.iter(|| black_box(consumer.record(|| s.get())))
    });
}

fn bench_signal_read_untracked(c: &mut Criterion) {
    let s = Signal::new(42i32);
    c.bench_function("signal_read_untracked", |b| {
        b.iter(|| black_box(untracked(|| s.get())))
    });
}

fn bench_signal_write_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_write_fanout");
    for consumers in [1usize, 10, 100] {
        let s = Signal::new(0i32);
        let readers: Vec<Consumer> = (0..consumers)
            .map(|_| {
                let consumer = Consumer::new();
                consumer.add_listener(|| {});
                consumer.record(|| s.get());
                consumer
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(consumers), &consumers, |b, _| {
            b.iter(|| s.write(black_box(1)))
        });
        drop(readers);
    }
    group.finish();
}

// =============================================================================
// CACHED BENCHMARKS
// =============================================================================

fn bench_cached_get_clean(c: &mut Criterion) {
    let s = Signal::new(42i32);
    let s_clone = s.clone();
    let doubled = cached(move || s_clone.get() * 2);
    let _ = doubled.get();

    c.bench_function("cached_get_clean", |b| b.iter(|| black_box(doubled.get())));
}

fn bench_cached_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_chain_write_then_read");
    for depth in [1usize, 10, 50] {
        let s = Signal::new(0i32);
        let s_clone = s.clone();
        let mut tail = cached(move || s_clone.get());
        for _ in 1..depth {
            let prev = tail.clone();
            tail = cached(move || prev.get() + 1);
        }

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut i = 0;
            b.iter(|| {
                i += 1;
                s.write(i);
                black_box(tail.get())
            })
        });
    }
    group.finish();
}

// =============================================================================
// EFFECT BENCHMARKS
// =============================================================================

fn bench_effect_write_flush(c: &mut Criterion) {
    let manual = Arc::new(ManualScheduler::new());
    let scheduler: Arc<dyn Scheduler> = manual.clone();
    let s = Signal::new(0i32);
    let s_clone = s.clone();
    let _handle = effect(
        move || {
            black_box(s_clone.get());
        },
        scheduler,
    );
    let _ = manual.flush();

    c.bench_function("effect_write_flush", |b| {
        let mut i = 0;
        b.iter(|| {
            i += 1;
            s.write(i);
            black_box(manual.flush())
        })
    });
}

fn bench_effect_coalesced_writes(c: &mut Criterion) {
    let manual = Arc::new(ManualScheduler::new());
    let scheduler: Arc<dyn Scheduler> = manual.clone();
    let s = Signal::new(0i32);
    let s_clone = s.clone();
    let _handle = effect(
        move || {
            black_box(s_clone.get());
        },
        scheduler,
    );
    let _ = manual.flush();

    c.bench_function("effect_ten_writes_one_flush", |b| {
        b.iter(|| {
            for i in 0..10 {
                s.write(i);
            }
            black_box(manual.flush())
        })
    });
}

criterion_group!(
    signals,
    bench_signal_create,
    bench_signal_read_tracked,
    bench_signal_read_untracked,
    bench_signal_write_fanout
);
criterion_group!(cached_values, bench_cached_get_clean, bench_cached_chain);
criterion_group!(effects, bench_effect_write_flush, bench_effect_coalesced_writes);
criterion_main!(signals, cached_values, effects);
