use std::path::PathBuf;
use voxelchange_core::{GridError, TimepointError};
use voxelchange_io::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to read project config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse project config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Timepoint(#[from] TimepointError),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
