use crate::error::MetricError;
use serde::{Deserialize, Serialize};

/// Collects raw samples for one (column, row, timepoint, measurement) cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleAccumulator {
    values: Vec<f64>,
}

impl SampleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Summarizes the samples, ignoring NaNs.
    ///
    /// Returns `None` when no usable sample exists.
    pub fn summarize(&self) -> Option<SummaryStats> {
        SummaryStats::from_samples(&self.values)
    }
}

impl Extend<f64> for SampleAccumulator {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        self.values.extend(iter);
    }
}

/// Descriptive statistics of one cell's samples.
///
/// Persisted as the 5-tuple `[min, max, mean, median, stdev]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 5]", into = "[f64; 5]")]
pub struct SummaryStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub stdev: f64,
}

impl SummaryStats {
    /// Summarizes the finite samples. NaN and infinite samples are dropped.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let mut values: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_unstable_by(f64::total_cmp);

        let n = values.len() as f64;
        let min = values[0];
        let max = values[values.len() - 1];

        let mut mean = values.iter().sum::<f64>() / n;
        if !mean.is_finite() {
            // plain sum overflowed
            mean = values.iter().map(|v| v / n).sum();
        }

        let mut variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let stdev = if variance.is_finite() {
            variance.sqrt()
        } else {
            let scale = min.abs().max(max.abs());
            variance = values
                .iter()
                .map(|v| (v / scale - mean / scale).powi(2))
                .sum::<f64>()
                / n;
            scale * variance.sqrt()
        };

        let mid = values.len() / 2;
        let median = if values.len() % 2 == 0 {
            let (lo, hi) = (values[mid - 1], values[mid]);
            let m = (lo + hi) / 2.0;
            if m.is_finite() {
                m
            } else {
                lo / 2.0 + hi / 2.0
            }
        } else {
            values[mid]
        };

        Some(Self {
            min,
            max,
            mean,
            median,
            stdev,
        })
    }

    pub fn to_array(&self) -> [f64; 5] {
        [self.min, self.max, self.mean, self.median, self.stdev]
    }

    pub fn coefficient_of_variation(&self) -> Result<f64, MetricError> {
        if self.mean == 0.0 {
            return Err(MetricError::DivideByZero);
        }
        Ok(self.stdev / self.mean)
    }
}

impl From<[f64; 5]> for SummaryStats {
    fn from(a: [f64; 5]) -> Self {
        Self {
            min: a[0],
            max: a[1],
            mean: a[2],
            median: a[3],
            stdev: a[4],
        }
    }
}

impl From<SummaryStats> for [f64; 5] {
    fn from(s: SummaryStats) -> Self {
        s.to_array()
    }
}
