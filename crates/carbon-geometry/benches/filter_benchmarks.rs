//! Benchmarks for boundary filtering.
//!
//! Run with: cargo bench --package carbon-geometry --bench filter_benchmarks

use carbon_common::CarbonPoint;
use carbon_geometry::{Boundary, PreparedBoundary};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Roughly circular boundary with `n` vertices.
fn circle_boundary(n: usize) -> Boundary {
    let mut ring: Vec<[f64; 2]> = (0..n)
        .map(|i| {
            let t = i as f64 / n as f64 * std::f64::consts::TAU;
            [-60.0 + 0.05 * t.cos(), -3.0 + 0.05 * t.sin()]
        })
        .collect();
    ring.push(ring[0]);
    Boundary::from_exterior(ring).expect("valid ring")
}

fn random_points(count: usize) -> Vec<CarbonPoint> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| CarbonPoint {
            longitude: rng.gen_range(-60.5..-59.5),
            latitude: rng.gen_range(-3.5..-2.5),
            class_code: 10,
            carbon_density: 120.0,
        })
        .collect()
}

// =============================================================================
// FILTER BENCHMARKS
// =============================================================================

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_filter");
    let points = random_points(200_000);
    group.throughput(Throughput::Elements(points.len() as u64));

    for vertices in [16usize, 256, 4096] {
        let boundary = circle_boundary(vertices);
        let prepared = PreparedBoundary::new(&boundary);

        group.bench_with_input(
            BenchmarkId::new("serial", vertices),
            &prepared,
            |b, prepared| b.iter(|| prepared.filter(black_box(&points), usize::MAX)),
        );
        group.bench_with_input(
            BenchmarkId::new("parallel", vertices),
            &prepared,
            |b, prepared| b.iter(|| prepared.filter(black_box(&points), 0)),
        );
    }

    group.finish();
}

fn bench_contains_without_prefilter(c: &mut Criterion) {
    let boundary = circle_boundary(4096);
    let points = random_points(10_000);

    c.bench_function("exact_test_only_4096", |b| {
        b.iter(|| {
            points
                .iter()
                .filter(|p| boundary.contains_point(p.longitude, p.latitude))
                .count()
        })
    });
}

criterion_group!(benches, bench_filter, bench_contains_without_prefilter);
criterion_main!(benches);
