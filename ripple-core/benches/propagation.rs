//! Benchmarks for write propagation
//!
//! Run with: cargo bench

use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_core::{batch, create_effect, create_memo, create_scope, Signal};

fn bench_signal_set(c: &mut Criterion) {
    let s = Signal::new(0i32);
    let mut next = 0;
    c.bench_function("signal_set_no_subscribers", |b| {
        b.iter(|| {
            next += 1;
            s.set(black_box(next))
        })
    });
}

fn bench_signal_set_same_value(c: &mut Criterion) {
    let s = Signal::new(42i32);
    c.bench_function("signal_set_same_value", |b| b.iter(|| s.set(black_box(42))));
}

fn bench_effect_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("effect_fanout");

    for count in [1usize, 10, 100] {
        let s = Signal::new(0i32);
        let runs = Rc::new(Cell::new(0usize));

        let scope = create_scope(|| {
            for _ in 0..count {
                let (s, runs) = (s.clone(), runs.clone());
                create_effect(move || {
                    black_box(s.get());
                    runs.set(runs.get() + 1);
                });
            }
        });

        let mut next = 0;
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                next += 1;
                s.set(next);
            })
        });

        scope.dispose();
    }

    group.finish();
}

fn bench_batch_flush(c: &mut Criterion) {
    let signals: Vec<Signal<i32>> = (0..10).map(Signal::new).collect();

    let scope = create_scope(|| {
        let signals = signals.clone();
        create_effect(move || {
            black_box(signals.iter().map(Signal::get).sum::<i32>());
        });
    });

    let mut next = 0;
    c.bench_function("batch_ten_writes", |b| {
        b.iter(|| {
            next += 1;
            batch(|| {
                for s in &signals {
                    s.set(next);
                }
            })
        })
    });

    scope.dispose();
}

fn bench_memo_refresh(c: &mut Criterion) {
    let s = Signal::new(0i32);
    let mut memo = None;

    let scope = create_scope(|| {
        let s = s.clone();
        memo = create_memo(move || s.get() * 2).ok();
    });
    let Some(memo) = memo else {
        return;
    };

    let mut next = 0;
    c.bench_function("memo_write_then_read", |b| {
        b.iter(|| {
            next += 1;
            s.set(next);
            black_box(memo.get())
        })
    });

    c.bench_function("memo_read_cached", |b| b.iter(|| black_box(memo.get())));

    scope.dispose();
}

criterion_group!(signal_benches, bench_signal_set, bench_signal_set_same_value);
criterion_group!(computation_benches, bench_effect_fanout, bench_batch_flush, bench_memo_refresh);
criterion_main!(signal_benches, computation_benches);
