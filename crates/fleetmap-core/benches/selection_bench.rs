//! # Selection Benchmarks
//!
//! Performance benchmarks for fleetmap-core tree operations.
//!
//! Run with: `cargo bench -p fleetmap-core`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fleetmap_core::{Bucket, NodeIndex, Select, Selector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;

/// Create a fleet with `regions` regions of `hosts` hosts, one node each.
fn create_fleet(regions: usize, hosts: usize) -> Bucket {
    let mut root = Bucket::default();
    let mut id = 0;
    for r in 0..regions {
        for h in 0..hosts {
            root.add_bucket(&format!("/region:r{r}/host:h{r}-{h}"), &[NodeIndex(id)])
                .expect("add");
            id += 1;
        }
    }
    root
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    for size in [10, 50, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(create_fleet(size, 10)));
        });
    }

    group.finish();
}

fn bench_max_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("max_selection");

    for size in [10, 50, 100].iter() {
        let fleet = create_fleet(*size, 10);
        let selects = vec![Select::new("region", 3), Select::new("host", 2)];

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(fleet.get_max_selection(&selects, &[])));
        });
    }

    group.finish();
}

fn bench_find_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_graph");

    for size in [10, 50, 100].iter() {
        let fleet = create_fleet(*size, 10);
        let selectors = vec![Selector::new(
            vec![Select::new("region", 3), Select::new("host", 2)],
            vec![],
        )];

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(42);
                black_box(fleet.find_graph(Some(&mut rng), &selectors))
            });
        });
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [10, 50, 100].iter() {
        let a = create_fleet(*size, 10);
        let mut b = Bucket::default();
        let offset = (size * 10) as i32;
        for r in 0..*size {
            for h in 0..10 {
                b.add_bucket(
                    &format!("/region:x{r}/host:x{r}-{h}"),
                    &[NodeIndex(offset + (r * 10 + h) as i32)],
                )
                .expect("add");
            }
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |bench, _| {
            bench.iter(|| {
                let mut merged = a.clone();
                merged.merge(b.clone());
                black_box(merged)
            });
        });
    }

    group.finish();
}

fn bench_wire_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire_round_trip");

    for size in [10, 50, 100].iter() {
        let fleet = create_fleet(*size, 10);
        let bytes = fleet.to_bytes();

        group.bench_with_input(BenchmarkId::new("encode", size), size, |b, _| {
            b.iter(|| black_box(fleet.to_bytes()));
        });
        group.bench_with_input(BenchmarkId::new("decode", size), size, |b, _| {
            b.iter(|| black_box(Bucket::from_bytes(&bytes)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_construction,
    bench_max_selection,
    bench_find_graph,
    bench_merge,
    bench_wire_round_trip,
);

criterion_main!(benches);
