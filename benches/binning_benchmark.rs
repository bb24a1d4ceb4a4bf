//! Benchmarks for fitting and applying the binning process
//!
//! Run with: cargo bench --bench binning_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use scorebin::pipeline::{BinningProcess, Dataset, Feature, FitConfig, Metric};

/// Synthetic dataset mixing uniform, skewed, target-driven and categorical features
fn generate_dataset(n_rows: usize, n_features: usize, seed: u64) -> (Dataset, Vec<u8>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let target: Vec<u8> = (0..n_rows).map(|_| u8::from(rng.gen::<f64>() > 0.8)).collect();

    let mut features = Vec::with_capacity(n_features);
    for i in 0..n_features {
        let name = format!("feature_{}", i);
        let feature = match i % 4 {
            0 => Feature::numeric(
                name,
                (0..n_rows).map(|_| Some(rng.gen::<f64>() * 100.0)).collect(),
            ),
            1 => Feature::numeric(
                name,
                (0..n_rows)
                    .map(|_| {
                        let v = rng.gen::<f64>();
                        // Right-skewed, with a few nulls
                        (v > 0.02).then_some(v * v * v * 100.0)
                    })
                    .collect(),
            ),
            2 => Feature::numeric(
                name,
                target
                    .iter()
                    .map(|&t| {
                        let base = if t == 1 { 40.0 } else { 60.0 };
                        Some((base + rng.gen::<f64>() * 40.0 - 20.0).round())
                    })
                    .collect(),
            ),
            _ => Feature::categorical(
                name,
                (0..n_rows)
                    .map(|_| Some(format!("cat_{}", rng.gen_range(0..12))))
                    .collect(),
            ),
        };
        features.push(feature);
    }

    (Dataset::new(features).unwrap(), target)
}

fn benchmark_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("binning_fit");
    let config = FitConfig::default();

    for (n_rows, n_features) in [(1_000, 8), (10_000, 20), (50_000, 40)] {
        let (dataset, target) = generate_dataset(n_rows, n_features, 42);
        group.throughput(Throughput::Elements(n_features as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", n_rows, n_features)),
            &dataset,
            |b, dataset| {
                b.iter(|| BinningProcess::fit(black_box(dataset), black_box(&target), &config));
            },
        );
    }

    group.finish();
}

fn benchmark_prebins(c: &mut Criterion) {
    let mut group = c.benchmark_group("max_n_prebins");
    let (dataset, target) = generate_dataset(20_000, 4, 7);

    for max_n_prebins in [10, 20, 50, 100] {
        let config = FitConfig {
            max_n_prebins,
            min_prebin_size: 0.005,
            ..Default::default()
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(max_n_prebins),
            &config,
            |b, config| {
                b.iter(|| BinningProcess::fit(black_box(&dataset), black_box(&target), config));
            },
        );
    }

    group.finish();
}

fn benchmark_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("binning_transform");

    for n_rows in [10_000, 100_000] {
        let (dataset, target) = generate_dataset(n_rows, 20, 11);
        let process = BinningProcess::fit(&dataset, &target, &FitConfig::default()).unwrap();
        group.throughput(Throughput::Elements(n_rows as u64));

        for metric in [Metric::Woe, Metric::Indices] {
            group.bench_with_input(
                BenchmarkId::new(metric.to_string(), n_rows),
                &dataset,
                |b, dataset| {
                    b.iter(|| process.transform(black_box(dataset), metric));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_fit, benchmark_prebins, benchmark_transform);
criterion_main!(benches);
