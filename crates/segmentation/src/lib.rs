#![forbid(unsafe_code)]

pub mod error;
pub mod event;
pub mod record;
pub mod segmenter;
pub mod summary;

pub use error::SegmentError;
pub use event::{Bucket, ChangeKind, Event, MissingObservation};
pub use record::{BucketRecord, ChangeSetRecord, ColumnRecord, OrderedMap, RecordDecodeError};
pub use segmenter::{
    derive_events, ChangeSegmenter, ChangeSet, ColumnOutcome, DEFAULT_MAX_GAP_COLUMNS,
};
pub use summary::{
    binned_volume, buckets_per_column, mean_buckets_per_column, median_buckets_per_column,
    BinnedVolume, ChangeSummary,
};
