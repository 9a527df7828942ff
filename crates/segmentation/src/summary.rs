use crate::segmenter::ChangeSet;
use std::collections::BTreeMap;
use std::fmt;

/// Aggregate counts and volumes over a [`ChangeSet`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSummary {
    pub gain_events: usize,
    pub loss_events: usize,
    pub no_change_events: usize,
    /// Rows inside missing buckets. Column-wide gaps are not counted.
    pub missing_voxels: usize,
    pub gain_voxels: usize,
    pub loss_voxels: usize,
    pub net_volume: f64,
    pub gross_volume: f64,
}

impl ChangeSummary {
    pub fn from_change_set(set: &ChangeSet) -> Self {
        let mut summary = Self::default();
        for event in set.events() {
            match event.is_gain() {
                Some(true) => {
                    summary.gain_events += 1;
                    summary.gain_voxels += event.len();
                }
                Some(false) => {
                    summary.loss_events += 1;
                    summary.loss_voxels += event.len();
                }
                None => summary.no_change_events += 1,
            }
            summary.net_volume += event.volume();
            summary.gross_volume += event.volume().abs();
        }
        summary.missing_voxels = set.missing_observations().map(|m| m.len()).sum();
        summary
    }

    pub fn changed_voxels(&self) -> usize {
        self.gain_voxels + self.loss_voxels
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} gain, {} loss, {} no-change events; {} voxels missing; net volume {:.4}, gross volume {:.4}",
            self.gain_events,
            self.loss_events,
            self.no_change_events,
            self.missing_voxels,
            self.net_volume,
            self.gross_volume
        )
    }
}

/// Number of buckets in each segmented column.
pub fn buckets_per_column(set: &ChangeSet) -> Vec<usize> {
    set.columns()
        .values()
        .filter_map(|c| c.buckets().map(BTreeMap::len))
        .collect()
}

pub fn mean_buckets_per_column(set: &ChangeSet) -> Option<f64> {
    let counts = buckets_per_column(set);
    if counts.is_empty() {
        return None;
    }
    Some(counts.iter().sum::<usize>() as f64 / counts.len() as f64)
}

pub fn median_buckets_per_column(set: &ChangeSet) -> Option<f64> {
    let mut counts = buckets_per_column(set);
    if counts.is_empty() {
        return None;
    }
    counts.sort_unstable();
    let mid = counts.len() / 2;
    if counts.len() % 2 == 0 {
        Some((counts[mid - 1] + counts[mid]) as f64 / 2.0)
    } else {
        Some(counts[mid] as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BinnedVolume {
    pub gain: f64,
    /// Magnitude of lost volume.
    pub loss: f64,
}

/// Gain and loss volume per height bin of `bin_factor` rows.
///
/// Rows are binned with `floor(row / bin_factor)`. No-change events are
/// ignored.
pub fn binned_volume(set: &ChangeSet, bin_factor: i64) -> BTreeMap<i64, BinnedVolume> {
    let bin_factor = bin_factor.max(1);
    let face = set.voxel_size() * set.voxel_size();
    let mut bins: BTreeMap<i64, BinnedVolume> = BTreeMap::new();

    for event in set.events() {
        let Some(gain) = event.is_gain() else {
            continue;
        };
        for (&row, &change) in event.voxels() {
            let bin = bins.entry(row.div_euclid(bin_factor)).or_default();
            if gain {
                bin.gain += change * face;
            } else {
                bin.loss += change.abs() * face;
            }
        }
    }
    bins
}
