//! Criterion benchmarks for tile yield resolution.
//!
//! - `calculate`: a single base record against three modifier stages
//! - `resolve_all`: 10k tile stacks resolved in one batch

use criterion::{Criterion, criterion_group, criterion_main};
use epoch_yields::{YieldCategory, YieldMode, YieldStack, Yields, resolve_all};
use std::hint::black_box;

fn tile_stack(seed: usize) -> YieldStack {
    let f = (seed % 7) as f64;
    let mut stack = YieldStack::new();
    stack
        .push(
            Yields::base()
                .with(YieldCategory::Food, 2.0 + f)
                .with(YieldCategory::Production, 1.0),
        )
        .push(Yields::new(YieldMode::Additive).with(YieldCategory::Gold, f))
        .push(Yields::new(YieldMode::PercentageAdditive).with(YieldCategory::Food, 0.25))
        .push(Yields::new(YieldMode::PercentageCumulative).with(YieldCategory::Production, 0.1));
    stack
}

fn bench_calculate(c: &mut Criterion) {
    let base = Yields::base().with(YieldCategory::Gold, 10.0);
    let additive = Yields::null().with(YieldCategory::Gold, 5.0);
    let pct = Yields::null().with(YieldCategory::Gold, 0.5);

    c.bench_function("calculate", |b| {
        b.iter(|| {
            let mut y = black_box(&base).clone();
            y.calculate(Some(&additive), Some(&pct), Some(&pct));
            y
        })
    });
}

fn bench_resolve_all(c: &mut Criterion) {
    let stacks: Vec<YieldStack> = (0..10_000).map(tile_stack).collect();
    c.bench_function("resolve_all_10k", |b| b.iter(|| resolve_all(black_box(&stacks))));
}

criterion_group!(benches, bench_calculate, bench_resolve_all);
criterion_main!(benches);
