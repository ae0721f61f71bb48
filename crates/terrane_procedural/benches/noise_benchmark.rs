//! Benchmark for base noise and field generation.
//!
//! TARGET: 1,000,000 base samples per second
//!
//! Run with: cargo bench --package terrane_procedural --bench noise_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use terrane_core::{CancellationToken, Task};
use terrane_procedural::{
    FractalFieldTask, FractalSettings, NoiseField, PerlinNoise, SimplexFieldTask, SimplexNoise,
    WorldSeed,
};

fn benchmark_single_sample(c: &mut Criterion) {
    let simplex = SimplexNoise::new(WorldSeed::new(42));
    let perlin = PerlinNoise::new(WorldSeed::new(42));

    c.bench_function("simplex_single_sample", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(simplex.sample(black_box(x), black_box(x * 0.7)))
        });
    });

    c.bench_function("perlin_single_sample", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(perlin.sample(black_box(x), black_box(x * 0.7)))
        });
    });
}

fn benchmark_million_samples(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42));

    let mut group = c.benchmark_group("million_samples");
    group.throughput(Throughput::Elements(1_000_000));
    group.sample_size(10);

    group.bench_function("1M_simplex_samples", |b| {
        b.iter(|| {
            for i in 0..1_000_000 {
                let x = f64::from(i % 1000) * 0.1;
                let z = f64::from(i / 1000) * 0.1;
                black_box(noise.sample(x, z));
            }
        });
    });

    group.finish();
}

fn benchmark_field_generation(c: &mut Criterion) {
    let simplex = Arc::new(SimplexNoise::new(WorldSeed::new(42)));
    let perlin = Arc::new(PerlinNoise::new(WorldSeed::new(42)));

    let mut group = c.benchmark_group("field_64x64");
    group.throughput(Throughput::Elements(64 * 64));

    group.bench_function("simplex_two_pass", |b| {
        b.iter(|| {
            let field = NoiseField::new([0, 0], [64, 64]).unwrap();
            let mut task = SimplexFieldTask::new(Arc::clone(&simplex), field, 48.0);
            let _ = task.process(&CancellationToken::new());
            black_box(task.into_field())
        });
    });

    group.bench_function("fractal_6_octaves", |b| {
        let settings = FractalSettings {
            octaves: 6,
            ..FractalSettings::default()
        };
        b.iter(|| {
            let field = NoiseField::new([0, 0], [64, 64]).unwrap();
            let mut task = FractalFieldTask::new(Arc::clone(&perlin), field, settings);
            let _ = task.process(&CancellationToken::new());
            black_box(task.into_field())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_sample,
    benchmark_million_samples,
    benchmark_field_generation
);
criterion_main!(benches);
