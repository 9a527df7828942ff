//! Voxel column statistics and surface-change segmentation for repeated
//! terrain point-cloud surveys.
//!
//! Points are binned into vertical voxel columns per timepoint
//! ([`aggregate`]), then pairs of timepoints are compared column by column
//! and segmented into gain, loss and missing-data runs ([`segmentation`]).
#![forbid(unsafe_code)]

pub use voxelchange_aggregate as aggregate;
pub use voxelchange_batch as batch;
pub use voxelchange_io as io;
pub use voxelchange_segmentation as segmentation;

pub use voxelchange_aggregate::{CellSummary, ColumnAggregator, ColumnSnapshot};
pub use voxelchange_core::{
    GridError, GridSpec, PointRecord, RecordError, SummaryStats, Timepoint, VoxelIndex,
};
pub use voxelchange_segmentation::{derive_events, Bucket, ChangeSegmenter, ChangeSet, Event};
