use crate::cell::CellSummary;
use std::collections::BTreeMap;

pub type Column = BTreeMap<i64, CellSummary>;

/// Finalized statistics of one timepoint: `col -> row -> CellSummary`.
///
/// Produced by [`ColumnAggregator::finalize`](crate::ColumnAggregator::finalize)
/// or loaded from storage; read-only once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnSnapshot {
    timepoint: String,
    columns: BTreeMap<i64, Column>,
}

impl ColumnSnapshot {
    pub fn new(timepoint: impl Into<String>) -> Self {
        Self {
            timepoint: timepoint.into(),
            columns: BTreeMap::new(),
        }
    }

    pub fn from_columns(timepoint: impl Into<String>, columns: BTreeMap<i64, Column>) -> Self {
        Self {
            timepoint: timepoint.into(),
            columns,
        }
    }

    pub(crate) fn insert(&mut self, col: i64, row: i64, summary: CellSummary) {
        self.columns.entry(col).or_default().insert(row, summary);
    }

    pub fn timepoint(&self) -> &str {
        &self.timepoint
    }

    pub fn columns(&self) -> &BTreeMap<i64, Column> {
        &self.columns
    }

    pub fn into_columns(self) -> BTreeMap<i64, Column> {
        self.columns
    }

    pub fn column(&self, col: i64) -> Option<&Column> {
        self.columns.get(&col)
    }

    pub fn cell(&self, col: i64, row: i64) -> Option<&CellSummary> {
        self.columns.get(&col).and_then(|c| c.get(&row))
    }

    /// Column indices in ascending order.
    pub fn column_indices(&self) -> impl Iterator<Item = i64> + '_ {
        self.columns.keys().copied()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell_count(&self) -> usize {
        self.columns.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Mean distance of the cell at `(col, row)`, if present.
    pub fn mean_distance(&self, col: i64, row: i64) -> Option<f64> {
        self.cell(col, row).map(|c| c.distance.mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxelchange_core::SummaryStats;

    fn summary(mean: f64) -> CellSummary {
        CellSummary {
            distance: SummaryStats::from([mean, mean, mean, mean, 0.0]),
            reflectance: None,
            scans: BTreeMap::new(),
        }
    }

    #[test]
    fn lookups() {
        let mut snap = ColumnSnapshot::new("TP1");
        snap.insert(3, 1, summary(1.0));
        snap.insert(-2, 0, summary(2.0));
        snap.insert(3, 2, summary(3.0));

        assert_eq!(snap.timepoint(), "TP1");
        assert_eq!(snap.column_indices().collect::<Vec<_>>(), vec![-2, 3]);
        assert_eq!(snap.column_count(), 2);
        assert_eq!(snap.cell_count(), 3);
        assert_eq!(snap.mean_distance(3, 2), Some(3.0));
        assert_eq!(snap.mean_distance(3, 5), None);
        assert!(snap.column(7).is_none());
    }

    #[test]
    fn empty_snapshot() {
        let snap = ColumnSnapshot::new("TP4");
        assert!(snap.is_empty());
        assert_eq!(snap.cell_count(), 0);
    }
}
