//! Request-path benchmarks for the coalescer

use coalesce::{DebouncePolicy, Debouncer, KeyedRegistry};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

fn bench_debouncer(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _guard = rt.enter();

    // Long wait so every request resets a pending timer
    let trailing = Debouncer::new(DebouncePolicy::trailing(Duration::from_secs(60)), |x: u64| x).unwrap();
    c.bench_function("debounce_trailing_reset", |b| {
        b.iter(|| black_box(trailing.call(black_box(1))));
    });

    let leading = Debouncer::new(DebouncePolicy::leading(Duration::from_secs(60)), |x: u64| x).unwrap();
    c.bench_function("debounce_leading_suppressed", |b| {
        b.iter(|| black_box(leading.call(black_box(1))));
    });

    trailing.cancel();
    leading.cancel();
}

fn bench_keyed(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _guard = rt.enter();

    let registry: KeyedRegistry<u64, u64> = KeyedRegistry::new().unwrap();
    let policy = DebouncePolicy::trailing(Duration::from_secs(60));
    let handles: Vec<_> = (0..1024u64)
        .map(|key| registry.with_key(key, policy, |x: u64| x))
        .collect();

    let mut next = 0usize;
    c.bench_function("keyed_1024_round_robin", |b| {
        b.iter(|| {
            next = (next + 1) % handles.len();
            black_box(handles[next].call(black_box(next as u64)))
        });
    });

    registry.cancel_all();
}

criterion_group!(benches, bench_debouncer, bench_keyed);
criterion_main!(benches);
