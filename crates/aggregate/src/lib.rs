#![forbid(unsafe_code)]

pub mod aggregator;
pub mod cell;
pub mod snapshot;

pub use aggregator::{ColumnAggregator, IngestReport};
pub use cell::{Cell, CellSummary};
pub use snapshot::{Column, ColumnSnapshot};
