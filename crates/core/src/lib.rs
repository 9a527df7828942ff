#![forbid(unsafe_code)]

pub mod error;
pub mod grid;
pub mod index;
pub mod point;
pub mod stats;
pub mod timepoint;

pub use error::{GridError, MetricError, RecordError, TimepointError};
pub use grid::GridSpec;
pub use index::{VoxelCoord, VoxelIndex};
pub use point::{MeasurementKind, PointRecord};
pub use stats::{SampleAccumulator, SummaryStats};
pub use timepoint::{order_timepoints, Timepoint};
