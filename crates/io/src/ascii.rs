//! Comma-delimited point rows as exported by the survey tooling.
//!
//! The first line of a file is a header. Each following row carries at least
//! `x, y, z`; rows with exactly ten fields carry reflectance at index 4.

use csv::{StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use voxelchange_core::{PointRecord, RecordError};

/// Field count of the reflectance-bearing export schema.
pub const REFLECTANCE_SCHEMA_FIELDS: usize = 10;
/// Position of the reflectance value in that schema.
pub const REFLECTANCE_FIELD: usize = 4;

/// Streaming reader yielding one parse result per data row.
pub struct PointReader<R: Read> {
    records: StringRecordsIntoIter<R>,
}

impl PointReader<File> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::from_reader(File::open(path)?))
    }
}

impl<R: Read> PointReader<R> {
    pub fn from_reader(reader: R) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader)
            .into_records();
        Self { records }
    }
}

impl<R: Read> Iterator for PointReader<R> {
    type Item = Result<PointRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match self.records.next()? {
            Ok(record) => {
                let line = record.position().map_or(0, |p| p.line());
                parse_record(&record, line)
            }
            Err(e) => Err(RecordError::Malformed {
                line: e.position().map_or(0, |p| p.line()),
                message: e.to_string(),
            }),
        };
        Some(item)
    }
}

/// Parses one data row. `line` is reported in errors.
pub fn parse_record(record: &StringRecord, line: u64) -> Result<PointRecord, RecordError> {
    if record.len() < 3 {
        return Err(RecordError::FieldCount {
            line,
            found: record.len(),
        });
    }

    let field = |idx: usize| -> Result<f64, RecordError> {
        let raw = record.get(idx).unwrap_or_default();
        raw.parse::<f64>().map_err(|_| RecordError::NonNumeric {
            line,
            field: idx,
            value: raw.to_string(),
        })
    };

    let point = PointRecord::new(field(0)?, field(1)?, field(2)?);
    if !point.is_finite() {
        return Err(RecordError::NonFinite { line });
    }

    if record.len() == REFLECTANCE_SCHEMA_FIELDS {
        Ok(point.with_reflectance(field(REFLECTANCE_FIELD)?))
    } else {
        Ok(point)
    }
}
