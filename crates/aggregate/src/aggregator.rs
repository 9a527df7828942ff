use crate::cell::Cell;
use crate::snapshot::ColumnSnapshot;
use hashbrown::HashMap;
use std::collections::BTreeSet;
use voxelchange_core::{GridSpec, PointRecord, RecordError, VoxelCoord, VoxelIndex};

/// Outcome of one [`ColumnAggregator::ingest`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: usize,
    pub skipped: usize,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.accepted + self.skipped
    }
}

/// Bins the points of one timepoint into voxel cells.
///
/// Several scans may be ingested before a single [`finalize`](Self::finalize)
/// (combined mode), or the aggregator may be finalized after every scan.
#[derive(Debug, Clone)]
pub struct ColumnAggregator {
    index: VoxelIndex,
    timepoint: String,
    cells: HashMap<(i64, i64), Cell>,
    scans: BTreeSet<String>,
}

impl ColumnAggregator {
    pub fn new(grid: &GridSpec, timepoint: impl Into<String>) -> Self {
        Self::with_index(grid.index(), timepoint)
    }

    pub fn with_index(index: VoxelIndex, timepoint: impl Into<String>) -> Self {
        Self {
            index,
            timepoint: timepoint.into(),
            cells: HashMap::new(),
            scans: BTreeSet::new(),
        }
    }

    pub fn timepoint(&self) -> &str {
        &self.timepoint
    }

    pub fn scans(&self) -> impl Iterator<Item = &str> + '_ {
        self.scans.iter().map(String::as_str)
    }

    /// Number of non-empty cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, col: i64, row: i64) -> Option<&Cell> {
        self.cells.get(&(col, row))
    }

    /// Consumes a stream of parsed point rows contributed by `scan`.
    ///
    /// Malformed rows are logged and skipped; they never abort the stream.
    pub fn ingest<I>(&mut self, records: I, scan: &str) -> IngestReport
    where
        I: IntoIterator<Item = Result<PointRecord, RecordError>>,
    {
        self.scans.insert(scan.to_string());
        let mut report = IngestReport::default();

        for (position, record) in records.into_iter().enumerate() {
            let point = match record {
                Ok(point) => point,
                Err(e) => {
                    log::warn!("scan {} ({}): skipping row: {}", scan, self.timepoint, e);
                    report.skipped += 1;
                    continue;
                }
            };
            if self.ingest_point(&point, scan).is_none() {
                log::warn!(
                    "scan {} ({}): skipping point {} with non-finite coordinates",
                    scan,
                    self.timepoint,
                    position + 1
                );
                report.skipped += 1;
                continue;
            }
            report.accepted += 1;
        }

        log::debug!(
            "scan {} ({}): ingested {} points, skipped {}, {} cells",
            scan,
            self.timepoint,
            report.accepted,
            report.skipped,
            self.cells.len()
        );
        report
    }

    /// Routes one point to its cell. Returns `None` for non-finite points.
    pub fn ingest_point(&mut self, point: &PointRecord, scan: &str) -> Option<VoxelCoord> {
        if !point.is_finite() {
            return None;
        }
        let coord = self.index.index(point.x, point.y, point.z);
        self.cells
            .entry(coord.key())
            .or_default()
            .add_sample(scan, point.distance(), point.reflectance);
        Some(coord)
    }

    /// Finalizes every cell and exports the timepoint's column snapshot.
    ///
    /// Calling this again without new data yields an identical snapshot.
    pub fn finalize(&mut self) -> ColumnSnapshot {
        let mut snapshot = ColumnSnapshot::new(self.timepoint.clone());
        for (&(col, row), cell) in self.cells.iter_mut() {
            match cell.finalize() {
                Some(summary) => snapshot.insert(col, row, summary.clone()),
                None => log::warn!(
                    "cell ({}, {}) of {} has no distance samples",
                    col,
                    row,
                    self.timepoint
                ),
            }
        }
        log::debug!(
            "finalized {} cells in {} columns for {}",
            snapshot.cell_count(),
            snapshot.column_count(),
            self.timepoint
        );
        snapshot
    }
}
