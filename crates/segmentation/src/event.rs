use std::collections::BTreeMap;
use std::sync::OnceLock;
use voxelchange_core::MetricError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Gain,
    Loss,
    NoChange,
}

impl ChangeKind {
    pub fn of(change: f64) -> Self {
        if change > 0.0 {
            Self::Gain
        } else if change < 0.0 {
            Self::Loss
        } else {
            Self::NoChange
        }
    }
}

/// A contiguous run of compatible change within one column.
///
/// `voxels` maps row index to `later.mean - earlier.mean`. The kind is the
/// sign of the top-most row's change. Volume is computed on first request
/// and memoized.
#[derive(Debug, Clone)]
pub struct Event {
    column: i64,
    timepoints: (String, String),
    voxel_size: f64,
    voxels: BTreeMap<i64, f64>,
    kind: ChangeKind,
    volume: OnceLock<f64>,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.column == other.column
            && self.timepoints == other.timepoints
            && self.voxel_size == other.voxel_size
            && self.voxels == other.voxels
            && self.kind == other.kind
    }
}

impl Event {
    /// Builds an event from its rows. Returns `None` for an empty row map.
    pub fn new(
        column: i64,
        timepoints: (String, String),
        voxel_size: f64,
        voxels: BTreeMap<i64, f64>,
    ) -> Option<Self> {
        let (_, &top) = voxels.iter().next_back()?;
        Some(Self {
            column,
            timepoints,
            voxel_size,
            kind: ChangeKind::of(top),
            voxels,
            volume: OnceLock::new(),
        })
    }

    pub fn column(&self) -> i64 {
        self.column
    }

    /// `(earlier, later)` timepoint names.
    pub fn timepoints(&self) -> (&str, &str) {
        (&self.timepoints.0, &self.timepoints.1)
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn voxels(&self) -> &BTreeMap<i64, f64> {
        &self.voxels
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// `Some(true)` for gain, `Some(false)` for loss, `None` for no change.
    pub fn is_gain(&self) -> Option<bool> {
        match self.kind {
            ChangeKind::Gain => Some(true),
            ChangeKind::Loss => Some(false),
            ChangeKind::NoChange => None,
        }
    }

    /// Net change volume: sum of row changes times the voxel face area.
    pub fn volume(&self) -> f64 {
        *self.volume.get_or_init(|| {
            let total: f64 = self.voxels.values().sum();
            total * self.voxel_size * self.voxel_size
        })
    }

    /// The memoized volume, or `None` if [`volume`](Self::volume) was never called.
    pub fn cached_volume(&self) -> Option<f64> {
        self.volume.get().copied()
    }

    /// Mean of the row indices, scaled to height. Not weighted by change.
    pub fn mean_height(&self) -> f64 {
        let total: i64 = self.voxels.keys().sum();
        total as f64 / self.voxels.len() as f64 * self.voxel_size
    }

    pub fn min_height(&self) -> f64 {
        self.voxels.keys().next().copied().unwrap_or_default() as f64 * self.voxel_size
    }

    pub fn max_height(&self) -> f64 {
        self.voxels.keys().next_back().copied().unwrap_or_default() as f64 * self.voxel_size
    }

    pub fn height_range(&self) -> f64 {
        self.max_height() - self.min_height()
    }

    /// Population standard deviation over mean of the row changes.
    pub fn coefficient_of_variation(&self) -> Result<f64, MetricError> {
        let n = self.voxels.len() as f64;
        let mean = self.voxels.values().sum::<f64>() / n;
        if mean == 0.0 {
            return Err(MetricError::DivideByZero);
        }
        let variance = self.voxels.values().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Ok(variance.sqrt() / mean)
    }

    /// Rows from top to bottom with their change.
    pub fn row_changes(&self) -> Vec<(i64, f64)> {
        self.voxels.iter().rev().map(|(&r, &c)| (r, c)).collect()
    }

    /// Rows from top to bottom with the running sum of change.
    pub fn cumulative_changes(&self) -> Vec<(i64, f64)> {
        let mut running = 0.0;
        self.voxels
            .iter()
            .rev()
            .map(|(&r, &c)| {
                running += c;
                (r, running)
            })
            .collect()
    }
}

/// Rows of a column where at least one timepoint has no data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MissingObservation {
    column: i64,
    voxels: BTreeMap<i64, Vec<String>>,
}

impl MissingObservation {
    pub fn new(column: i64, voxels: BTreeMap<i64, Vec<String>>) -> Self {
        Self { column, voxels }
    }

    pub fn column(&self) -> i64 {
        self.column
    }

    /// Row index to the names of timepoints lacking that row.
    pub fn voxels(&self) -> &BTreeMap<i64, Vec<String>> {
        &self.voxels
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }
}

/// One segmentation record of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Bucket {
    Event(Event),
    Missing(MissingObservation),
}

impl Bucket {
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Self::Event(e) => Some(e),
            Self::Missing(_) => None,
        }
    }

    pub fn as_missing(&self) -> Option<&MissingObservation> {
        match self {
            Self::Missing(m) => Some(m),
            Self::Event(_) => None,
        }
    }

    pub fn rows(&self) -> Vec<i64> {
        match self {
            Self::Event(e) => e.voxels().keys().copied().collect(),
            Self::Missing(m) => m.voxels().keys().copied().collect(),
        }
    }
}
