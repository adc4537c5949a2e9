//! Codec throughput benchmarks.
//!
//! Measures the cost of encoding and decoding whole override snapshots of
//! realistic shape: mostly sparse records with a few fully populated ones.
//!
//! Run with: `cargo bench --bench codec_benchmarks`

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use patchwright_core::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Every tenth item is fully populated; the rest override a single field.
fn item_snapshot(count: usize) -> BTreeMap<String, ItemDescriptor> {
    (0..count)
        .map(|i| {
            let d = if i % 10 == 0 {
                ItemDescriptor {
                    name: format!("$item_bench_{i}"),
                    description: "A benchmark item with a moderately long description.".to_owned(),
                    crafting_station: "forge".to_owned(),
                    weight: Some(3),
                    max_durability: Some(200),
                    repair_station_level: Some(2),
                    craft: Some(vec![
                        Requirement::new("Iron", 20, true),
                        Requirement::new("Wood", 4, true),
                        Requirement::new("LeatherScraps", 2, false),
                    ]),
                    damage: Some(DamageTypes {
                        slash: 55,
                        ..Default::default()
                    }),
                    damage_per_level: Some(DamageTypes {
                        slash: 6,
                        ..Default::default()
                    }),
                    clone_source: "SwordIron".to_owned(),
                    ..Default::default()
                }
            } else {
                ItemDescriptor {
                    weight: Some(i as i32),
                    ..Default::default()
                }
            };
            (format!("BenchItem{i:05}"), d)
        })
        .collect()
}

fn monster_snapshot(count: usize) -> BTreeMap<String, MonsterDescriptor> {
    (0..count)
        .map(|i| {
            let d = MonsterDescriptor {
                health: Some(100 + i as i32),
                walk_speed: Some(1.5),
                damage_multiplier: (i % 3 == 0).then_some(1.25),
                ..Default::default()
            };
            (format!("BenchMonster{i:05}"), d)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Benchmark 1: Snapshot encode at various sizes
// ---------------------------------------------------------------------------

fn bench_item_snapshot_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("item_snapshot_encode");

    for &count in &[100usize, 1_000, 5_000] {
        let snapshot = item_snapshot(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &snapshot, |b, snapshot| {
            b.iter(|| black_box(encode_snapshot(black_box(snapshot))));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 2: Snapshot decode at various sizes
// ---------------------------------------------------------------------------

fn bench_item_snapshot_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("item_snapshot_decode");

    for &count in &[100usize, 1_000, 5_000] {
        let bytes = encode_snapshot(&item_snapshot(count));
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter(|| {
                let decoded = decode_snapshot::<ItemDescriptor>(black_box(bytes)).unwrap();
                black_box(decoded.len());
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 3: Monster round trip plus fingerprint
// ---------------------------------------------------------------------------

fn bench_monster_round_trip_1k(c: &mut Criterion) {
    let snapshot = monster_snapshot(1_000);

    c.bench_function("monster_round_trip_fingerprint_1k", |b| {
        b.iter(|| {
            let bytes = encode_snapshot(&snapshot);
            let hash = fingerprint(&bytes);
            let decoded = decode_snapshot::<MonsterDescriptor>(&bytes).unwrap();
            black_box((hash, decoded.len()));
        });
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_item_snapshot_encode,
    bench_item_snapshot_decode,
    bench_monster_round_trip_1k,
);
criterion_main!(benches);
