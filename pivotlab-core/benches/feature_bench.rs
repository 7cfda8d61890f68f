//! Criterion benchmarks for the feature pipeline.
//!
//! 1. Individual indicators over long histories
//! 2. The full feature engine
//! 3. Labels plus chronological split

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use pivotlab_core::data::{synthetic_bars, SyntheticConfig};
use pivotlab_core::dataset::build_dataset;
use pivotlab_core::domain::{BarTable, Timeframe};
use pivotlab_core::features::compute_features;
use pivotlab_core::indicators::{Ema, Indicator, Macd, Rsi, WeeklyPivot};
use pivotlab_core::labels::attach_labels;

fn make_table(n: usize) -> BarTable {
    let bars = synthetic_bars("BENCH", Timeframe::H1, n, &SyntheticConfig::default());
    BarTable::new(bars).expect("synthetic bars are ordered")
}

fn bench_indicators(c: &mut Criterion) {
    let table = make_table(10_000);
    let bars = table.bars();
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Ema::new(50)),
        Box::new(Rsi::new(14)),
        Box::new(Macd::histogram(12, 26, 9)),
        Box::new(WeeklyPivot::new()),
    ];

    let mut group = c.benchmark_group("indicators");
    for indicator in &indicators {
        group.bench_function(indicator.name(), |b| {
            b.iter(|| indicator.compute(black_box(bars)))
        });
    }
    group.finish();
}

fn bench_feature_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_engine");
    for n in [1_000usize, 10_000, 50_000] {
        let table = make_table(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &table, |b, table| {
            b.iter(|| compute_features(black_box(table)))
        });
    }
    group.finish();
}

fn bench_dataset(c: &mut Criterion) {
    let features = compute_features(&make_table(10_000));
    c.bench_function("labels_and_split_10k", |b| {
        b.iter(|| {
            let labeled = attach_labels(black_box(&features), 4, 0.005).expect("valid params");
            build_dataset(&labeled, 0.2).expect("non-empty")
        })
    });
}

criterion_group!(benches, bench_indicators, bench_feature_engine, bench_dataset);
criterion_main!(benches);
