use std::path::PathBuf;

/// Configuration errors raised while building a [`GridSpec`](crate::GridSpec).
///
/// These are fatal: a grid never operates with an undefined voxel size.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("voxel_size must be > 0 and finite, got {0}")]
    InvalidVoxelSize(f64),

    #[error("grid specification {0} has no voxel_size entry")]
    MissingVoxelSize(PathBuf),

    #[error("grid specification entry `{key}` must be a finite number, got `{value}`")]
    InvalidValue { key: String, value: String },

    #[error("failed to read grid specification {path}: {source}")]
    SpecRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse grid specification {path}: {source}")]
    SpecParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A single point row that could not be turned into a [`PointRecord`](crate::PointRecord).
///
/// Line numbers are 1-based and count the header line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("line {line}: expected at least 3 fields, found {found}")]
    FieldCount { line: u64, found: usize },

    #[error("line {line}: field {field} is not numeric: `{value}`")]
    NonNumeric {
        line: u64,
        field: usize,
        value: String,
    },

    #[error("line {line}: coordinate is not finite")]
    NonFinite { line: u64 },

    #[error("line {line}: {message}")]
    Malformed { line: u64, message: String },
}

impl RecordError {
    pub fn line(&self) -> u64 {
        match self {
            Self::FieldCount { line, .. }
            | Self::NonNumeric { line, .. }
            | Self::NonFinite { line }
            | Self::Malformed { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimepointError {
    #[error("timepoint name `{0}` has no numeric suffix")]
    MissingOrdinal(String),
}

/// A derived metric that is undefined for its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MetricError {
    #[error("division by zero: mean is zero")]
    DivideByZero,
}
