//! Segments change between two synthetic timepoints and prints each event.

use voxelchange::segmentation::{
    binned_volume, mean_buckets_per_column, Bucket, ChangeSummary,
};
use voxelchange::{derive_events, ColumnAggregator, GridSpec, PointRecord};

fn main() {
    env_logger::init();

    let grid = GridSpec::new("demo", 0.1).expect("valid grid");
    let mut before = ColumnAggregator::new(&grid, "TP1");
    let mut after = ColumnAggregator::new(&grid, "TP4");

    for col in 0..5 {
        for row in 0..30 {
            let x = col as f64 * 0.1 + 0.05;
            let z = row as f64 * 0.1 + 0.05;
            before.ingest_point(&PointRecord::new(x, 2.0, z), "SP01");
            // A scarp retreats in the upper rows, debris piles up below,
            // and rows 12..14 of column 2 were not captured.
            let y = match row {
                r if r >= 20 => 2.0 - 0.03 * col as f64,
                0..=8 => 2.05,
                _ => 2.0,
            };
            if !(col == 2 && (12..14).contains(&row)) {
                after.ingest_point(&PointRecord::new(x, y, z), "SP01");
            }
        }
    }

    let set = derive_events(&after.finalize(), &before.finalize(), grid.voxel_size)
        .expect("ordered timepoints");
    println!("Comparing {} -> {}", set.earlier(), set.later());

    for (col, id, bucket) in set.buckets() {
        match bucket {
            Bucket::Event(e) => println!(
                "col {:>2} event {:>2}: {:?}, rows {}..={}, volume {:.5}",
                col,
                id,
                e.kind(),
                e.voxels().keys().next().copied().unwrap_or_default(),
                e.voxels().keys().next_back().copied().unwrap_or_default(),
                e.volume()
            ),
            Bucket::Missing(m) => println!(
                "col {:>2} event {:>2}: missing rows {:?}",
                col,
                id,
                m.voxels().keys().collect::<Vec<_>>()
            ),
        }
    }

    println!("{}", ChangeSummary::from_change_set(&set));
    println!("Mean buckets per column: {:?}", mean_buckets_per_column(&set));
    for (bin, volume) in binned_volume(&set, 10) {
        println!("bin {}: gain {:.5}, loss {:.5}", bin, volume.gain, volume.loss);
    }
}
