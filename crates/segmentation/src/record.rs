//! Persisted shape of a [`ChangeSet`].
//!
//! `{col: [names]}` for a column-wide gap, otherwise
//! `{col: {event_id: {row: change}}}` for change buckets and
//! `{col: {event_id: {row: [names]}}}` for missing buckets. The bucket kind
//! is carried only by the value shape (list vs number), so these types keep
//! that shape exactly and convert to the tagged model on load.
//!
//! Columns and event ids are written in ascending numeric order, rows from
//! the top of the column down, so the first row key of a bucket is its top row.

use crate::event::{Bucket, Event, MissingObservation};
use crate::segmenter::{ChangeSet, ColumnOutcome};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// JSON object that keeps its keys in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: impl Into<String>, value: V) {
        self.0.push((key.into(), value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ToString, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(entry) = access.next_entry::<String, V>()? {
            entries.push(entry);
        }
        Ok(OrderedMap(entries))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BucketRecord {
    Change(OrderedMap<f64>),
    Missing(OrderedMap<Vec<String>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRecord {
    Missing(Vec<String>),
    Buckets(OrderedMap<BucketRecord>),
}

pub type ChangeSetRecord = OrderedMap<ColumnRecord>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {what} key `{key}` in change document")]
pub struct RecordDecodeError {
    pub what: &'static str,
    pub key: String,
}

fn parse_key<T: FromStr>(what: &'static str, key: &str) -> Result<T, RecordDecodeError> {
    key.parse().map_err(|_| RecordDecodeError {
        what,
        key: key.to_string(),
    })
}

impl ChangeSet {
    pub fn to_record(&self) -> ChangeSetRecord {
        self.columns()
            .iter()
            .map(|(col, outcome)| {
                let record = match outcome {
                    ColumnOutcome::Missing(names) => ColumnRecord::Missing(names.clone()),
                    ColumnOutcome::Segmented(buckets) => ColumnRecord::Buckets(
                        buckets
                            .iter()
                            .map(|(id, bucket)| (id, bucket_record(bucket)))
                            .collect(),
                    ),
                };
                (col, record)
            })
            .collect()
    }

    /// Rebuilds the tagged model from its persisted shape.
    pub fn from_record(
        earlier: &str,
        later: &str,
        voxel_size: f64,
        record: &ChangeSetRecord,
    ) -> Result<Self, RecordDecodeError> {
        let timepoints = (earlier.to_string(), later.to_string());
        let mut columns = BTreeMap::new();

        for (col_key, column) in record.iter() {
            let col: i64 = parse_key("column", col_key)?;
            let outcome = match column {
                ColumnRecord::Missing(names) => ColumnOutcome::Missing(names.clone()),
                ColumnRecord::Buckets(buckets) => {
                    let mut out = BTreeMap::new();
                    for (id_key, bucket) in buckets.iter() {
                        let id: u32 = parse_key("event id", id_key)?;
                        if let Some(b) = decode_bucket(col, &timepoints, voxel_size, bucket)? {
                            out.insert(id, b);
                        }
                    }
                    ColumnOutcome::Segmented(out)
                }
            };
            columns.insert(col, outcome);
        }

        Ok(ChangeSet::new(earlier, later, voxel_size, columns))
    }
}

fn bucket_record(bucket: &Bucket) -> BucketRecord {
    match bucket {
        Bucket::Event(e) => BucketRecord::Change(
            e.voxels()
                .iter()
                .rev()
                .map(|(row, change)| (row, *change))
                .collect(),
        ),
        Bucket::Missing(m) => BucketRecord::Missing(
            m.voxels()
                .iter()
                .rev()
                .map(|(row, names)| (row, names.clone()))
                .collect(),
        ),
    }
}

fn decode_bucket(
    col: i64,
    timepoints: &(String, String),
    voxel_size: f64,
    bucket: &BucketRecord,
) -> Result<Option<Bucket>, RecordDecodeError> {
    Ok(match bucket {
        BucketRecord::Change(rows) => {
            let voxels = rows
                .iter()
                .map(|(k, v)| Ok((parse_key::<i64>("row", k)?, *v)))
                .collect::<Result<BTreeMap<_, _>, RecordDecodeError>>()?;
            Event::new(col, timepoints.clone(), voxel_size, voxels).map(Bucket::Event)
        }
        BucketRecord::Missing(rows) => {
            let voxels = rows
                .iter()
                .map(|(k, v)| Ok((parse_key::<i64>("row", k)?, v.clone())))
                .collect::<Result<BTreeMap<_, _>, RecordDecodeError>>()?;
            Some(Bucket::Missing(MissingObservation::new(col, voxels)))
        }
    })
}
