use crate::event::{Bucket, Event, MissingObservation};
use std::collections::{BTreeMap, BTreeSet};
use voxelchange_aggregate::{Column, ColumnSnapshot};
use voxelchange_core::{GridError, GridSpec, Timepoint, TimepointError};

/// Result of comparing one column across two timepoints.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOutcome {
    /// The whole column is absent from the listed timepoints; no rows were segmented.
    Missing(Vec<String>),
    /// Buckets keyed by event id, ids counting up from the top of the column.
    Segmented(BTreeMap<u32, Bucket>),
}

impl ColumnOutcome {
    pub fn buckets(&self) -> Option<&BTreeMap<u32, Bucket>> {
        match self {
            Self::Segmented(b) => Some(b),
            Self::Missing(_) => None,
        }
    }
}

/// Segmentation of every column between an earlier and a later timepoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    earlier: String,
    later: String,
    voxel_size: f64,
    columns: BTreeMap<i64, ColumnOutcome>,
}

impl ChangeSet {
    pub fn new(
        earlier: impl Into<String>,
        later: impl Into<String>,
        voxel_size: f64,
        columns: BTreeMap<i64, ColumnOutcome>,
    ) -> Self {
        Self {
            earlier: earlier.into(),
            later: later.into(),
            voxel_size,
            columns,
        }
    }

    pub fn earlier(&self) -> &str {
        &self.earlier
    }

    pub fn later(&self) -> &str {
        &self.later
    }

    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    pub fn columns(&self) -> &BTreeMap<i64, ColumnOutcome> {
        &self.columns
    }

    pub fn column(&self, col: i64) -> Option<&ColumnOutcome> {
        self.columns.get(&col)
    }

    pub fn buckets(&self) -> impl Iterator<Item = (i64, u32, &Bucket)> + '_ {
        self.columns.iter().flat_map(|(&col, outcome)| {
            outcome
                .buckets()
                .into_iter()
                .flat_map(move |b| b.iter().map(move |(&id, bucket)| (col, id, bucket)))
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.buckets().filter_map(|(_, _, b)| b.as_event())
    }

    pub fn missing_observations(&self) -> impl Iterator<Item = &MissingObservation> + '_ {
        self.buckets().filter_map(|(_, _, b)| b.as_missing())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Gain,
    Loss,
}

impl Sign {
    fn of(change: f64) -> Option<Self> {
        if change > 0.0 {
            Some(Self::Gain)
        } else if change < 0.0 {
            Some(Self::Loss)
        } else {
            None
        }
    }
}

/// Run state while walking a column from the top row down.
#[derive(Debug)]
struct RunState {
    event_id: u32,
    run_sign: Option<Sign>,
    just_saw_gap: bool,
    first_row: bool,
}

impl RunState {
    fn new() -> Self {
        Self {
            event_id: 0,
            run_sign: None,
            just_saw_gap: false,
            first_row: true,
        }
    }

    /// Every missing row is its own boundary, except the very first row.
    fn missing_row(&mut self) -> u32 {
        if !self.first_row {
            self.event_id += 1;
        }
        self.first_row = false;
        self.run_sign = None;
        self.just_saw_gap = true;
        self.event_id
    }

    fn present_row(&mut self, change: f64) -> u32 {
        if self.continues_run(change) {
            if self.just_saw_gap {
                self.just_saw_gap = false;
                self.event_id += 1;
            }
        } else if !self.first_row {
            self.event_id += 1;
        }
        self.first_row = false;
        self.event_id
    }

    /// Zero change is a wildcard. A conflicting sign breaks the run and
    /// primes the next one with the incoming sign.
    fn continues_run(&mut self, change: f64) -> bool {
        let Some(sign) = Sign::of(change) else {
            return true;
        };
        match self.run_sign {
            Some(run) if run == sign => true,
            None => {
                self.run_sign = Some(sign);
                true
            }
            Some(_) => {
                self.run_sign = Some(sign);
                false
            }
        }
    }
}

#[derive(Default)]
struct PendingBucket {
    changes: BTreeMap<i64, f64>,
    missing: BTreeMap<i64, Vec<String>>,
}

/// Largest run of empty columns between two observed columns that is still
/// recorded column by column as missing from both timepoints.
pub const DEFAULT_MAX_GAP_COLUMNS: u64 = 100_000;

/// Segments surface change between two finalized timepoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeSegmenter {
    voxel_size: f64,
    max_gap_columns: u64,
}

impl ChangeSegmenter {
    pub fn new(voxel_size: f64) -> Result<Self, GridError> {
        GridSpec::new("", voxel_size).map(|spec| Self::from_grid(&spec))
    }

    pub fn from_grid(grid: &GridSpec) -> Self {
        Self {
            voxel_size: grid.voxel_size,
            max_gap_columns: DEFAULT_MAX_GAP_COLUMNS,
        }
    }

    /// Gaps wider than `limit` columns are logged and left out of the change
    /// set instead of being filled with missing entries.
    pub fn with_max_gap_columns(mut self, limit: u64) -> Self {
        self.max_gap_columns = limit;
        self
    }

    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    pub fn max_gap_columns(&self) -> u64 {
        self.max_gap_columns
    }

    /// Compares two snapshots in chronological order, whatever order they
    /// are passed in.
    pub fn derive_events(
        &self,
        a: &ColumnSnapshot,
        b: &ColumnSnapshot,
    ) -> Result<ChangeSet, TimepointError> {
        let ta = Timepoint::parse(a.timepoint())?;
        let tb = Timepoint::parse(b.timepoint())?;
        if ta <= tb {
            Ok(self.segment(a, b))
        } else {
            Ok(self.segment(b, a))
        }
    }

    /// Compares `earlier` to `later` as given.
    ///
    /// Every column between the smallest and largest observed column gets an
    /// outcome, except inside gaps wider than [`Self::max_gap_columns`].
    pub fn segment(&self, earlier: &ColumnSnapshot, later: &ColumnSnapshot) -> ChangeSet {
        let earlier_name = earlier.timepoint();
        let later_name = later.timepoint();
        let mut columns = BTreeMap::new();

        let observed: BTreeSet<i64> = earlier
            .column_indices()
            .chain(later.column_indices())
            .collect();

        let mut previous: Option<i64> = None;
        for &col in &observed {
            if let Some(prev) = previous {
                self.fill_gap(prev, col, (earlier_name, later_name), &mut columns);
            }
            previous = Some(col);

            let outcome = match (earlier.column(col), later.column(col)) {
                (Some(e), Some(l)) => ColumnOutcome::Segmented(
                    self.segment_column(col, (earlier_name, later_name), e, l),
                ),
                (None, _) => ColumnOutcome::Missing(vec![earlier_name.to_string()]),
                (Some(_), None) => ColumnOutcome::Missing(vec![later_name.to_string()]),
            };
            columns.insert(col, outcome);
        }

        ChangeSet::new(earlier_name, later_name, self.voxel_size, columns)
    }

    /// Marks the empty columns strictly between `prev` and `next` as missing
    /// from both timepoints.
    fn fill_gap(
        &self,
        prev: i64,
        next: i64,
        (earlier_name, later_name): (&str, &str),
        columns: &mut BTreeMap<i64, ColumnOutcome>,
    ) {
        let empty = next.abs_diff(prev).saturating_sub(1);
        if empty == 0 {
            return;
        }
        if empty > self.max_gap_columns {
            log::warn!(
                "{} empty columns between {} and {} exceed the limit of {}; gap not recorded",
                empty,
                prev,
                next,
                self.max_gap_columns
            );
            return;
        }
        log::debug!(
            "columns {}..{} missing from {} and {}",
            prev + 1,
            next,
            earlier_name,
            later_name
        );
        for col in prev + 1..next {
            columns.insert(
                col,
                ColumnOutcome::Missing(vec![earlier_name.to_string(), later_name.to_string()]),
            );
        }
    }

    /// Run-length segmentation of one column present in both timepoints.
    ///
    /// Rows present in either timepoint are visited from the highest index
    /// to the lowest.
    pub fn segment_column(
        &self,
        col: i64,
        (earlier_name, later_name): (&str, &str),
        earlier: &Column,
        later: &Column,
    ) -> BTreeMap<u32, Bucket> {
        let rows: BTreeSet<i64> = earlier.keys().chain(later.keys()).copied().collect();
        let mut state = RunState::new();
        let mut pending: BTreeMap<u32, PendingBucket> = BTreeMap::new();

        for &row in rows.iter().rev() {
            match (earlier.get(&row), later.get(&row)) {
                (Some(e), Some(l)) => {
                    let change = l.distance.mean - e.distance.mean;
                    let id = state.present_row(change);
                    pending.entry(id).or_default().changes.insert(row, change);
                }
                (e, l) => {
                    let mut lacking = Vec::with_capacity(2);
                    if e.is_none() {
                        lacking.push(earlier_name.to_string());
                    }
                    if l.is_none() {
                        lacking.push(later_name.to_string());
                    }
                    let id = state.missing_row();
                    pending.entry(id).or_default().missing.insert(row, lacking);
                }
            }
        }

        let timepoints = (earlier_name.to_string(), later_name.to_string());
        pending
            .into_iter()
            .map(|(id, p)| {
                debug_assert!(p.changes.is_empty() || p.missing.is_empty());
                let bucket = match Event::new(col, timepoints.clone(), self.voxel_size, p.changes) {
                    Some(event) => Bucket::Event(event),
                    None => Bucket::Missing(MissingObservation::new(col, p.missing)),
                };
                (id, bucket)
            })
            .collect()
    }
}

/// Convenience wrapper around [`ChangeSegmenter::derive_events`].
pub fn derive_events(
    a: &ColumnSnapshot,
    b: &ColumnSnapshot,
    voxel_size: f64,
) -> Result<ChangeSet, crate::SegmentError> {
    let segmenter = ChangeSegmenter::new(voxel_size)?;
    Ok(segmenter.derive_events(a, b)?)
}
