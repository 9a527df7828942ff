use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use voxelchange::segmentation::ChangeSummary;
use voxelchange::{derive_events, CellSummary, ColumnSnapshot, SummaryStats};

/// A snapshot of `columns` x `rows` cells with roughly 5% of rows absent.
fn random_snapshot(name: &str, columns: i64, rows: i64, seed: u64) -> ColumnSnapshot {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = BTreeMap::new();
    for col in 0..columns {
        let mut column = BTreeMap::new();
        for row in 0..rows {
            if rng.gen_bool(0.05) {
                continue;
            }
            let mean = 10.0 + rng.gen_range(-0.5..0.5);
            column.insert(
                row,
                CellSummary {
                    distance: SummaryStats::from([mean, mean, mean, mean, 0.0]),
                    reflectance: None,
                    scans: BTreeMap::new(),
                },
            );
        }
        data.insert(col, column);
    }
    ColumnSnapshot::from_columns(name, data)
}

fn bench_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment");
    for columns in [100, 1_000, 4_000] {
        let a = random_snapshot("TP1", columns, 200, 1);
        let b = random_snapshot("TP2", columns, 200, 2);
        group.bench_with_input(
            BenchmarkId::new("derive_events", columns),
            &(a, b),
            |bench, (a, b)| {
                bench.iter(|| {
                    let set = derive_events(a, b, 0.05).unwrap();
                    ChangeSummary::from_change_set(&set)
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_segment);
criterion_main!(benches);
