use crate::config::ProjectConfig;
use crate::error::BatchError;
use rayon::prelude::*;
use std::path::PathBuf;
use voxelchange_aggregate::ColumnAggregator;
use voxelchange_core::{order_timepoints, GridSpec};
use voxelchange_io::{OutputStore, PointReader, ProjectStructure, ScanFile, StoreError};
use voxelchange_segmentation::{ChangeSegmenter, ChangeSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Written(PathBuf),
    /// The output already existed.
    Skipped(PathBuf),
}

#[derive(Debug)]
pub struct TaskFailure {
    pub task: String,
    pub error: BatchError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<TaskFailure>,
}

impl BatchReport {
    fn record(&mut self, task: String, result: Result<TaskOutcome, BatchError>) {
        match result {
            Ok(TaskOutcome::Written(path)) => self.written.push(path),
            Ok(TaskOutcome::Skipped(path)) => self.skipped.push(path),
            Err(error) => {
                log::error!("{}: {}", task, error);
                self.failures.push(TaskFailure { task, error });
            }
        }
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.written.extend(other.written);
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs aggregation and change derivation tasks on a dedicated rayon pool.
///
/// Every task reads its own inputs and writes one output path, so tasks
/// share nothing but the filesystem.
pub struct BatchRunner {
    grid: GridSpec,
    store: OutputStore,
    pool: rayon::ThreadPool,
}

impl BatchRunner {
    pub fn new(grid: GridSpec, store: OutputStore, workers: Option<usize>) -> Result<Self, BatchError> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = workers {
            builder = builder.num_threads(n);
        }
        let pool = builder.build()?;
        log::debug!("batch pool with {} workers", pool.current_num_threads());
        Ok(Self { grid, store, pool })
    }

    pub fn from_config(config: &ProjectConfig) -> Result<Self, BatchError> {
        Self::new(config.grid.clone(), config.store(), config.workers)
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Aggregates every discovered file, either one snapshot per scan or one
    /// combined snapshot per `(slice, timepoint)`.
    pub fn aggregate_files(&self, structure: &ProjectStructure, combine_scans: bool) -> BatchReport {
        let results: Vec<(String, Result<TaskOutcome, BatchError>)> = if combine_scans {
            let groups: Vec<_> = structure.groups().collect();
            self.pool.install(|| {
                groups
                    .par_iter()
                    .map(|&((slice, tp), files)| {
                        (format!("{}_{}", slice, tp), self.aggregate_group(slice, tp, files))
                    })
                    .collect()
            })
        } else {
            let files: Vec<&ScanFile> = structure
                .timepoints()
                .values()
                .flat_map(|slices| slices.values().flatten())
                .collect();
            self.pool.install(|| {
                files
                    .par_iter()
                    .map(|file| {
                        let task = format!("{}_{}_{}", file.slice, file.scan, file.timepoint);
                        (task, self.aggregate_scan(file))
                    })
                    .collect()
            })
        };

        let mut report = BatchReport::default();
        for (task, result) in results {
            report.record(task, result);
        }
        log::info!(
            "aggregation: {} written, {} skipped, {} failed",
            report.written.len(),
            report.skipped.len(),
            report.failures.len()
        );
        report
    }

    /// Aggregates one scan file into its own snapshot.
    pub fn aggregate_scan(&self, file: &ScanFile) -> Result<TaskOutcome, BatchError> {
        let path = self
            .store
            .scan_snapshot_path(&file.slice, &file.scan, &file.timepoint);
        if path.exists() {
            log::info!("{} exists, skipping", path.display());
            return Ok(TaskOutcome::Skipped(path));
        }

        let mut aggregator = ColumnAggregator::new(&self.grid, file.timepoint.as_str());
        ingest_file(&mut aggregator, file)?;
        let snapshot = aggregator.finalize();
        let written = self
            .store
            .write_scan_snapshot(&file.slice, &file.scan, &snapshot)?;
        Ok(TaskOutcome::Written(written))
    }

    /// Aggregates all scans of a slice at one timepoint into one snapshot.
    pub fn aggregate_group(
        &self,
        slice: &str,
        timepoint: &str,
        files: &[ScanFile],
    ) -> Result<TaskOutcome, BatchError> {
        let path = self.store.combined_snapshot_path(slice, timepoint);
        if path.exists() {
            log::info!("{} exists, skipping", path.display());
            return Ok(TaskOutcome::Skipped(path));
        }

        let mut aggregator = ColumnAggregator::new(&self.grid, timepoint);
        for file in files {
            ingest_file(&mut aggregator, file)?;
        }
        let snapshot = aggregator.finalize();
        let written = self.store.write_combined_snapshot(slice, &snapshot)?;
        Ok(TaskOutcome::Written(written))
    }

    /// Derives a change set for every pair of `timepoints` of one slice.
    pub fn derive_slice_changes(&self, slice: &str, timepoints: &[String]) -> BatchReport {
        let pairs: Vec<(String, String, String)> = timepoints
            .iter()
            .enumerate()
            .flat_map(|(i, a)| {
                timepoints[i + 1..]
                    .iter()
                    .map(move |b| (slice.to_string(), a.clone(), b.clone()))
            })
            .collect();
        self.derive_pairs(&pairs)
    }

    /// Derives change sets for all timepoint pairs of every slice.
    pub fn derive_all_changes(&self, structure: &ProjectStructure) -> BatchReport {
        let pairs: Vec<(String, String, String)> = structure
            .slices()
            .into_keys()
            .flat_map(|slice| {
                structure
                    .timepoint_pairs(&slice)
                    .into_iter()
                    .map(move |(a, b)| (slice.clone(), a, b))
            })
            .collect();
        self.derive_pairs(&pairs)
    }

    fn derive_pairs(&self, pairs: &[(String, String, String)]) -> BatchReport {
        let results: Vec<_> = self.pool.install(|| {
            pairs
                .par_iter()
                .map(|(slice, a, b)| {
                    let task = format!("{}_{}_{}", slice, a, b);
                    (task, self.derive_pair(slice, a, b))
                })
                .collect()
        });

        let mut report = BatchReport::default();
        for (task, result) in results {
            report.record(task, result);
        }
        log::info!(
            "change derivation: {} written, {} skipped, {} failed",
            report.written.len(),
            report.skipped.len(),
            report.failures.len()
        );
        report
    }

    /// Derives the change set between two combined snapshots of a slice.
    /// The timepoints may be given in either order.
    pub fn derive_pair(&self, slice: &str, a: &str, b: &str) -> Result<TaskOutcome, BatchError> {
        let (earlier, later) = order_timepoints(a, b)?;
        let path = self.store.change_set_path(slice, earlier, later);
        if path.exists() {
            log::info!("{} exists, skipping", path.display());
            return Ok(TaskOutcome::Skipped(path));
        }

        let first = self.store.load_combined_snapshot(slice, earlier)?;
        let second = self.store.load_combined_snapshot(slice, later)?;
        let set = ChangeSegmenter::from_grid(&self.grid).segment(&first, &second);
        log::info!(
            "slice {} {} -> {}: {}",
            slice,
            earlier,
            later,
            ChangeSummary::from_change_set(&set)
        );
        let written = self.store.write_change_set(slice, &set)?;
        Ok(TaskOutcome::Written(written))
    }

    /// Aggregates the project, then derives changes when scans are combined.
    pub fn run(&self, structure: &ProjectStructure, combine_scans: bool) -> BatchReport {
        let mut report = self.aggregate_files(structure, combine_scans);
        if combine_scans {
            report.merge(self.derive_all_changes(structure));
        }
        report
    }
}

fn ingest_file(aggregator: &mut ColumnAggregator, file: &ScanFile) -> Result<(), BatchError> {
    let reader = PointReader::open(&file.path).map_err(|source| StoreError::Io {
        path: file.path.clone(),
        source,
    })?;
    let report = aggregator.ingest(reader, &file.scan);
    log::debug!(
        "{}: {} points accepted, {} skipped",
        file.path.display(),
        report.accepted,
        report.skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_points(dir: &Path, name: &str, rows: &[(f64, f64, f64)]) {
        let mut text = String::from("x,y,z\n");
        for (x, y, z) in rows {
            text.push_str(&format!("{},{},{}\n", x, y, z));
        }
        fs::write(dir.join(name), text).unwrap();
    }

    fn runner(out: &Path) -> BatchRunner {
        let grid = GridSpec::new("g", 1.0).unwrap();
        BatchRunner::new(grid, OutputStore::new(out, "g"), Some(2)).unwrap()
    }

    #[test]
    fn per_scan_mode_writes_one_snapshot_per_file() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_points(input.path(), "00_SP01_TP1.txt", &[(0.5, 1.0, 0.5)]);
        write_points(input.path(), "00_SP02_TP1.txt", &[(1.5, 2.0, 0.5)]);

        let r = runner(out.path());
        let structure = ProjectStructure::discover(input.path()).unwrap();
        let report = r.aggregate_files(&structure, false);
        assert!(report.is_success());
        assert_eq!(report.written.len(), 2);
        assert!(r.store().scan_snapshot_path("00", "SP02", "TP1").exists());

        let again = r.aggregate_files(&structure, false);
        assert_eq!(again.written.len(), 0);
        assert_eq!(again.skipped.len(), 2);
    }

    #[test]
    fn combined_run_derives_changes() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_points(input.path(), "00_SP01_TP1.txt", &[(0.5, 1.0, 2.5), (0.5, 1.0, 1.5)]);
        write_points(input.path(), "00_SP02_TP1.txt", &[(0.5, 3.0, 2.5)]);
        write_points(input.path(), "00_SP01_TP2.txt", &[(0.5, 4.0, 2.5), (0.5, 1.0, 1.5)]);

        let r = runner(out.path());
        let structure = ProjectStructure::discover(input.path()).unwrap();
        let report = r.run(&structure, true);
        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.written.len(), 3);

        let tp1 = r.store().load_combined_snapshot("00", "TP1").unwrap();
        let cell = tp1.cell(0, 2).unwrap();
        assert_eq!(cell.distance.mean, 2.0);
        assert_eq!(cell.scan_count(), 2);

        let set = r.store().load_change_set("00", "TP1", "TP2", 1.0).unwrap();
        let events: Vec<_> = set.events().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].voxels()[&2], 2.0);
        assert_eq!(events[0].voxels()[&1], 0.0);
    }

    #[test]
    fn pair_order_does_not_matter_and_reruns_skip() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_points(input.path(), "03_SP01_TP2.txt", &[(0.5, 1.0, 0.5)]);
        write_points(input.path(), "03_SP01_TP10.txt", &[(0.5, 0.5, 0.5)]);

        let r = runner(out.path());
        let structure = ProjectStructure::discover(input.path()).unwrap();
        assert!(r.aggregate_files(&structure, true).is_success());

        let first = r.derive_pair("03", "TP10", "TP2").unwrap();
        assert_eq!(
            first,
            TaskOutcome::Written(r.store().change_set_path("03", "TP2", "TP10"))
        );
        let second = r
            .derive_slice_changes("03", &["TP2".to_string(), "TP10".to_string()]);
        assert_eq!(second.skipped.len(), 1);
    }

    #[test]
    fn failures_are_reported_without_aborting() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_points(input.path(), "00_SP01_TP1.txt", &[(0.5, 1.0, 0.5)]);
        write_points(input.path(), "00_SP01_TP2.txt", &[(0.5, 2.0, 0.5)]);

        let r = runner(out.path());
        let structure = ProjectStructure::discover(input.path()).unwrap();
        assert!(r.aggregate_files(&structure, true).is_success());

        let report = r.derive_slice_changes(
            "00",
            &["TP1".to_string(), "TP2".to_string(), "TP3".to_string(), "base".to_string()],
        );
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.failures.len(), 5);
        assert!(report
            .failures
            .iter()
            .any(|f| matches!(f.error, BatchError::Timepoint(_))));
        assert!(report
            .failures
            .iter()
            .any(|f| matches!(f.error, BatchError::Store(StoreError::Io { .. }))));
    }
}
