//! Runs a whole project: `cargo run --example aggregate_scans -- project.json`.
//!
//! Without an argument a small synthetic project is generated in a
//! temporary directory.

use std::fs;
use std::path::Path;
use voxelchange::batch::{BatchRunner, ProjectConfig};
use voxelchange::io::ProjectStructure;
use voxelchange::GridSpec;

fn synthetic_project(dir: &Path) -> ProjectConfig {
    let input = dir.join("input");
    fs::create_dir_all(&input).expect("create input dir");
    for (tp, shift) in [("TP1", 0.0), ("TP2", 0.04), ("TP3", -0.02)] {
        for scan in ["SP01", "SP02"] {
            let mut text = String::from("//X,Y,Z\n");
            for i in 0..2_000 {
                let x = (i % 40) as f64 * 0.05 + 0.01;
                let z = (i / 40) as f64 * 0.05 + 0.01;
                let y = 10.0 + (x * 3.0).sin() * 0.1 + if z > 1.2 { shift } else { -shift };
                text.push_str(&format!("{:.4},{:.4},{:.4}\n", x, y, z));
            }
            fs::write(input.join(format!("00_{}_{}.txt", scan, tp)), text).expect("write scan");
        }
    }
    ProjectConfig {
        grid: GridSpec::new("demo", 0.1).expect("valid grid"),
        input_dir: input,
        output_root: dir.join("output"),
        workers: None,
        combine_scans: true,
    }
}

fn main() {
    env_logger::init();

    let tmp = tempfile::tempdir().expect("temp dir");
    let config = match std::env::args().nth(1) {
        Some(path) => ProjectConfig::load(path).expect("load project config"),
        None => synthetic_project(tmp.path()),
    };

    let structure = ProjectStructure::discover(&config.input_dir).expect("discover inputs");
    println!("Timepoints: {:?}", structure.timepoints().keys().collect::<Vec<_>>());
    println!("Slices: {:?}", structure.slices());

    let runner = BatchRunner::from_config(&config).expect("build runner");
    let report = runner.run(&structure, config.combine_scans);
    println!(
        "Written: {}, skipped: {}, failed: {}",
        report.written.len(),
        report.skipped.len(),
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  {}: {}", failure.task, failure.error);
    }
}
