//! # Handle Table Benchmark
//!
//! Add, lookup and churn (remove + re-add) on a full table.
//!
//! Run with: `cargo bench --package ferrite_memory --bench handle_table_benchmark`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ferrite_memory::{Arena, HandleTable};

/// Records per table.
const RECORD_COUNT: usize = 100_000;

/// Arena large enough for one table of `[f32; 4]` records.
fn arena() -> Arena {
    Arena::new(RECORD_COUNT * (16 + 8 + 8) + 64).unwrap()
}

/// Deterministic shuffle of `0..count`.
fn shuffled_indices(count: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..count).collect();
    let mut state = seed;
    for i in (1..count).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        indices.swap(i, (state as usize) % (i + 1));
    }
    indices
}

/// Benchmark: fill an empty table.
fn bench_add(c: &mut Criterion) {
    let mut arena = arena();
    let mut table = HandleTable::<[f32; 4], _>::new(&mut arena, RECORD_COUNT).unwrap();

    c.bench_function("table_add_100k", |b| {
        b.iter(|| {
            table.clear();
            for i in 0..RECORD_COUNT {
                black_box(table.add([i as f32; 4]).unwrap());
            }
        });
    });
}

/// Benchmark: random-order lookups.
fn bench_get_random(c: &mut Criterion) {
    let mut arena = arena();
    let mut table = HandleTable::<[f32; 4], _>::new(&mut arena, RECORD_COUNT).unwrap();
    let handles: Vec<_> = (0..RECORD_COUNT)
        .map(|i| table.add([i as f32; 4]).unwrap())
        .collect();
    let order = shuffled_indices(RECORD_COUNT, 0x9E37_79B9_7F4A_7C15);

    c.bench_function("table_get_random_100k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for &i in &order {
                if let Some(record) = table.get(handles[i]) {
                    sum += record[0];
                }
            }
            black_box(sum)
        });
    });
}

/// Benchmark: dense iteration.
fn bench_iterate(c: &mut Criterion) {
    let mut arena = arena();
    let mut table = HandleTable::<[f32; 4], _>::new(&mut arena, RECORD_COUNT).unwrap();
    for i in 0..RECORD_COUNT {
        table.add([i as f32; 4]).unwrap();
    }

    c.bench_function("table_iter_mut_100k", |b| {
        b.iter(|| {
            for record in table.iter_mut() {
                record[0] += record[1] * 0.016;
            }
            black_box(table.len())
        });
    });
}

/// Benchmark: remove and re-add every record in random order.
fn bench_churn(c: &mut Criterion) {
    let mut arena = arena();
    let mut table = HandleTable::<[f32; 4], _>::new(&mut arena, RECORD_COUNT).unwrap();
    let mut handles: Vec<_> = (0..RECORD_COUNT)
        .map(|i| table.add([i as f32; 4]).unwrap())
        .collect();
    let order = shuffled_indices(RECORD_COUNT, 42);

    c.bench_function("table_churn_100k", |b| {
        b.iter(|| {
            for &i in &order {
                let record = table.remove(handles[i]).unwrap();
                handles[i] = table.add(record).unwrap();
            }
            black_box(table.len())
        });
    });
}

criterion_group!(benches, bench_add, bench_get_random, bench_iterate, bench_churn);

criterion_main!(benches);
