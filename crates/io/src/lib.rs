#![forbid(unsafe_code)]

pub mod ascii;
pub mod error;
pub mod naming;
pub mod store;

pub use ascii::{parse_record, PointReader};
pub use error::StoreError;
pub use naming::{discover_scan_files, sort_timepoints, ProjectStructure, ScanFile};
pub use store::{atomic_write, OutputStore, SnapshotDocument};
