use voxelchange_core::{GridError, TimepointError};

#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Timepoint(#[from] TimepointError),
}
