use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use voxelchange_core::{MeasurementKind, SampleAccumulator, SummaryStats};

/// Finalized statistics of one voxel for one timepoint.
///
/// Persisted as `[distance, reflectance | null, {scan: point_count}]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "(SummaryStats, Option<SummaryStats>, BTreeMap<String, u64>)",
    into = "(SummaryStats, Option<SummaryStats>, BTreeMap<String, u64>)"
)]
pub struct CellSummary {
    pub distance: SummaryStats,
    pub reflectance: Option<SummaryStats>,
    pub scans: BTreeMap<String, u64>,
}

impl CellSummary {
    pub fn stats(&self, kind: MeasurementKind) -> Option<&SummaryStats> {
        match kind {
            MeasurementKind::Distance => Some(&self.distance),
            MeasurementKind::Reflectance => self.reflectance.as_ref(),
        }
    }

    /// Total points contributed by every scan.
    pub fn point_count(&self) -> u64 {
        self.scans.values().sum()
    }

    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }
}

impl From<(SummaryStats, Option<SummaryStats>, BTreeMap<String, u64>)> for CellSummary {
    fn from((distance, reflectance, scans): (SummaryStats, Option<SummaryStats>, BTreeMap<String, u64>)) -> Self {
        Self {
            distance,
            reflectance,
            scans,
        }
    }
}

impl From<CellSummary> for (SummaryStats, Option<SummaryStats>, BTreeMap<String, u64>) {
    fn from(c: CellSummary) -> Self {
        (c.distance, c.reflectance, c.scans)
    }
}

/// Raw samples landing in one voxel during one timepoint's ingestion.
///
/// The summary is cached by [`Cell::finalize`] and dropped again when new
/// samples arrive, so repeated finalization without new data is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    distance: SampleAccumulator,
    reflectance: SampleAccumulator,
    scans: BTreeMap<String, u64>,
    summary: Option<CellSummary>,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sample(&mut self, scan: &str, distance: f64, reflectance: Option<f64>) {
        self.summary = None;
        self.distance.push(distance);
        if let Some(r) = reflectance {
            self.reflectance.push(r);
        }
        match self.scans.get_mut(scan) {
            Some(count) => *count += 1,
            None => {
                self.scans.insert(scan.to_string(), 1);
            }
        }
    }

    pub fn samples(&self, kind: MeasurementKind) -> &SampleAccumulator {
        match kind {
            MeasurementKind::Distance => &self.distance,
            MeasurementKind::Reflectance => &self.reflectance,
        }
    }

    pub fn scans(&self) -> &BTreeMap<String, u64> {
        &self.scans
    }

    pub fn is_finalized(&self) -> bool {
        self.summary.is_some()
    }

    /// Freezes the samples into summary statistics.
    ///
    /// Returns `None` only if the cell holds no usable distance sample.
    pub fn finalize(&mut self) -> Option<&CellSummary> {
        if self.summary.is_none() {
            let distance = self.distance.summarize()?;
            self.summary = Some(CellSummary {
                distance,
                reflectance: self.reflectance.summarize(),
                scans: self.scans.clone(),
            });
        }
        self.summary.as_ref()
    }
}
