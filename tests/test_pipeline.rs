use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use voxelchange::io::PointReader;
use voxelchange::segmentation::{ChangeKind, ChangeSummary, ColumnOutcome};
use voxelchange::{
    derive_events, ColumnAggregator, ColumnSnapshot, GridSpec, PointRecord, RecordError,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a survey of `columns` columns and `rows` rows where every point in
/// a cell has distance `surface(col, row)`. Positions are jittered inside
/// the voxel.
fn survey(
    grid: &GridSpec,
    timepoint: &str,
    columns: i64,
    rows: i64,
    seed: u64,
    surface: impl Fn(i64, i64) -> f64,
) -> ColumnSnapshot {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut aggregator = ColumnAggregator::new(grid, timepoint);
    let v = grid.voxel_size;
    for scan in ["SP01", "SP02"] {
        let mut points: Vec<Result<PointRecord, RecordError>> = Vec::new();
        for col in 0..columns {
            for row in 0..rows {
                for _ in 0..4 {
                    let x = (col as f64 + rng.gen_range(0.05..0.95)) * v;
                    let z = (row as f64 + rng.gen_range(0.05..0.95)) * v;
                    let y = surface(col, row);
                    points.push(Ok(PointRecord::new(x, y, z)));
                }
            }
        }
        let report = aggregator.ingest(points, scan);
        assert_eq!(report.skipped, 0);
    }
    aggregator.finalize()
}

#[test]
fn scans_to_change_events() {
    init_logger();
    let grid = GridSpec::new("synthetic", 0.5).unwrap();

    let before = survey(&grid, "TP1", 6, 10, 1, |_, _| 10.0);
    // Upper half of columns 0..3 moves out by 0.3, lower half of every
    // column moves in by 0.2.
    let after = survey(&grid, "TP2", 6, 10, 2, |col, row| {
        if row >= 5 && col < 3 {
            10.3
        } else if row < 5 {
            9.8
        } else {
            10.0
        }
    });

    assert_eq!(before.column_count(), 6);
    assert_eq!(before.cell_count(), 60);
    let cell = before.cell(2, 3).unwrap();
    assert_eq!(cell.point_count(), 8);
    assert_eq!(cell.scan_count(), 2);

    let set = derive_events(&after, &before, grid.voxel_size).unwrap();
    assert_eq!(set.earlier(), "TP1");
    assert_eq!(set.later(), "TP2");

    for col in 0..3 {
        let buckets = set.column(col).and_then(ColumnOutcome::buckets).unwrap();
        assert_eq!(buckets.len(), 2, "column {col}");
        let top = buckets[&0].as_event().unwrap();
        assert_eq!(top.kind(), ChangeKind::Gain);
        assert_eq!(top.voxels().keys().copied().collect::<Vec<_>>(), (5..10).collect::<Vec<_>>());
        let bottom = buckets[&1].as_event().unwrap();
        assert_eq!(bottom.kind(), ChangeKind::Loss);
        assert_eq!(bottom.len(), 5);
    }

    let summary = ChangeSummary::from_change_set(&set);
    assert_eq!(summary.gain_events, 3);
    assert_eq!(summary.loss_events, 3);
    assert_eq!(summary.missing_voxels, 0);
    // Columns 3..6 start flat, so their single event is a no-change event
    // that still carries the lower loss rows.
    assert_eq!(summary.no_change_events, 3);
    let expected_net = (4.5 - 6.0) * 0.25;
    assert!((summary.net_volume - expected_net).abs() < 1e-9, "{}", summary.net_volume);
}

#[test]
fn comparison_is_commutative() {
    let grid = GridSpec::new("g", 1.0).unwrap();
    let a = survey(&grid, "TP3", 3, 4, 7, |c, r| (c + r) as f64);
    let b = survey(&grid, "TP12", 3, 4, 8, |c, r| (c * r) as f64);
    let forward = derive_events(&a, &b, 1.0).unwrap();
    let backward = derive_events(&b, &a, 1.0).unwrap();
    assert_eq!(forward, backward);
    assert_eq!(forward.earlier(), "TP3");
}

#[test]
fn ascii_rows_feed_the_aggregator() {
    let text = "\
//X,Y,Z,R,G,B,Reflectance,Nx,Ny,Nz
0.25,1.0,0.75,0,-5.0,0,0,0,0,0
0.30,3.0,0.80,0,-7.0,0,0,0,0,0
0.30,oops,0.80,0,-7.0,0,0,0,0,0
1.25,2.0,0.75,0,-6.0,0,0,0,0,0
";
    let grid = GridSpec::new("g", 1.0).unwrap();
    let mut aggregator = ColumnAggregator::new(&grid, "TP1");
    let report = aggregator.ingest(PointReader::from_reader(text.as_bytes()), "SP01");
    assert_eq!(report.accepted, 3);
    assert_eq!(report.skipped, 1);

    let snapshot = aggregator.finalize();
    let cell = snapshot.cell(0, 0).unwrap();
    assert_eq!(cell.distance.mean, 2.0);
    assert_eq!(cell.distance.min, 1.0);
    assert_eq!(cell.distance.max, 3.0);
    assert_eq!(cell.distance.stdev, 1.0);
    let reflectance = cell.reflectance.unwrap();
    assert_eq!(reflectance.mean, -6.0);
    assert_eq!(cell.scans["SP01"], 2);
    assert_eq!(snapshot.mean_distance(1, 0), Some(2.0));
}

#[test]
fn documented_column_segments_as_expected() {
    use std::collections::BTreeMap;
    use voxelchange::CellSummary;
    use voxelchange::SummaryStats;

    fn column(rows: &[(i64, f64)]) -> BTreeMap<i64, CellSummary> {
        rows.iter()
            .map(|&(r, m)| {
                (
                    r,
                    CellSummary {
                        distance: SummaryStats::from([m, m, m, m, 0.0]),
                        reflectance: None,
                        scans: BTreeMap::new(),
                    },
                )
            })
            .collect()
    }

    let t1 = ColumnSnapshot::from_columns(
        "TP1",
        [(0, column(&[(10, 1.0), (9, 1.0), (8, 1.0), (7, 1.0), (6, 1.0)]))].into(),
    );
    let t2 = ColumnSnapshot::from_columns(
        "TP2",
        [(0, column(&[(10, 1.1), (9, 1.2), (8, 0.9), (6, 0.95)]))].into(),
    );
    let set = derive_events(&t1, &t2, 0.1).unwrap();
    let buckets = set.column(0).and_then(ColumnOutcome::buckets).unwrap();

    assert_eq!(buckets[&0].rows(), vec![9, 10]);
    assert_eq!(buckets[&0].as_event().unwrap().kind(), ChangeKind::Gain);
    assert_eq!(buckets[&1].rows(), vec![8]);
    assert_eq!(buckets[&1].as_event().unwrap().kind(), ChangeKind::Loss);
    assert_eq!(buckets[&2].as_missing().unwrap().voxels()[&7], vec!["TP2"]);
    assert_eq!(buckets[&3].rows(), vec![6]);
    assert_eq!(buckets[&3].as_event().unwrap().kind(), ChangeKind::Loss);
}
