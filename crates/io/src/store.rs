//! JSON persistence of snapshots and change sets under an injected root.
//!
//! Layout below `{root}/{grid}`:
//!
//! - `{slice}_{scan}_{tp}.json`: one scan's snapshot
//! - `slice_timepoint/{slice}_{tp}.json`: combined snapshot of a slice
//! - `change/slice_timepoint_pairs/{slice}_{tp1}_{tp2}.json`: change set,
//!   `tp1` earlier

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use voxelchange_aggregate::{CellSummary, ColumnSnapshot};
use voxelchange_segmentation::{ChangeSet, ChangeSetRecord};

/// Persisted snapshot: `voxels` is `{col: {row: cell}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub grid_name: String,
    pub timepoint: String,
    pub slice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan: Option<String>,
    pub voxels: BTreeMap<i64, BTreeMap<i64, CellSummary>>,
}

impl SnapshotDocument {
    pub fn new(
        grid_name: &str,
        slice: &str,
        scan: Option<&str>,
        snapshot: &ColumnSnapshot,
    ) -> Self {
        Self {
            grid_name: grid_name.to_string(),
            timepoint: snapshot.timepoint().to_string(),
            slice: slice.to_string(),
            scan: scan.map(str::to_string),
            voxels: snapshot.columns().clone(),
        }
    }

    pub fn into_snapshot(self) -> ColumnSnapshot {
        ColumnSnapshot::from_columns(self.timepoint, self.voxels)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputStore {
    root: PathBuf,
    grid_name: String,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>, grid_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            grid_name: grid_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn grid_name(&self) -> &str {
        &self.grid_name
    }

    pub fn grid_dir(&self) -> PathBuf {
        self.root.join(&self.grid_name)
    }

    pub fn scan_snapshot_path(&self, slice: &str, scan: &str, timepoint: &str) -> PathBuf {
        self.grid_dir()
            .join(format!("{}_{}_{}.json", slice, scan, timepoint))
    }

    pub fn combined_snapshot_path(&self, slice: &str, timepoint: &str) -> PathBuf {
        self.grid_dir()
            .join("slice_timepoint")
            .join(format!("{}_{}.json", slice, timepoint))
    }

    pub fn change_set_path(&self, slice: &str, earlier: &str, later: &str) -> PathBuf {
        self.grid_dir()
            .join("change")
            .join("slice_timepoint_pairs")
            .join(format!("{}_{}_{}.json", slice, earlier, later))
    }

    pub fn write_scan_snapshot(
        &self,
        slice: &str,
        scan: &str,
        snapshot: &ColumnSnapshot,
    ) -> Result<PathBuf, StoreError> {
        let path = self.scan_snapshot_path(slice, scan, snapshot.timepoint());
        let doc = SnapshotDocument::new(&self.grid_name, slice, Some(scan), snapshot);
        write_json(&path, &doc)?;
        Ok(path)
    }

    pub fn write_combined_snapshot(
        &self,
        slice: &str,
        snapshot: &ColumnSnapshot,
    ) -> Result<PathBuf, StoreError> {
        let path = self.combined_snapshot_path(slice, snapshot.timepoint());
        let doc = SnapshotDocument::new(&self.grid_name, slice, None, snapshot);
        write_json(&path, &doc)?;
        Ok(path)
    }

    pub fn read_snapshot(&self, path: impl AsRef<Path>) -> Result<SnapshotDocument, StoreError> {
        read_json(path.as_ref())
    }

    pub fn load_combined_snapshot(
        &self,
        slice: &str,
        timepoint: &str,
    ) -> Result<ColumnSnapshot, StoreError> {
        let path = self.combined_snapshot_path(slice, timepoint);
        let doc: SnapshotDocument = read_json(&path)?;
        if doc.timepoint != timepoint {
            log::warn!(
                "{} records timepoint {}, expected {}",
                path.display(),
                doc.timepoint,
                timepoint
            );
        }
        Ok(doc.into_snapshot())
    }

    pub fn write_change_set(&self, slice: &str, set: &ChangeSet) -> Result<PathBuf, StoreError> {
        let path = self.change_set_path(slice, set.earlier(), set.later());
        write_json(&path, &set.to_record())?;
        Ok(path)
    }

    pub fn load_change_set(
        &self,
        slice: &str,
        earlier: &str,
        later: &str,
        voxel_size: f64,
    ) -> Result<ChangeSet, StoreError> {
        let path = self.change_set_path(slice, earlier, later);
        let record: ChangeSetRecord = read_json(&path)?;
        ChangeSet::from_record(earlier, later, voxel_size, &record)
            .map_err(|source| StoreError::Decode { path, source })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let text = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| StoreError::json(path, e))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let data = serde_json::to_vec(value).map_err(|e| StoreError::json(path, e))?;
    log::info!("exporting {}", path.display());
    atomic_write(path, &data).map_err(|e| StoreError::io(path, e))?;
    log::info!("exported {} ({} bytes)", path.display(), data.len());
    Ok(())
}

/// Writes `{path}.tmp`, syncs it, then renames it over `path`.
/// Parent directories are created as needed.
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxelchange_core::SummaryStats;

    fn cell(mean: f64, scan: &str) -> CellSummary {
        CellSummary {
            distance: SummaryStats::from([mean - 1.0, mean + 1.0, mean, mean, 0.5]),
            reflectance: Some(SummaryStats::from([-9.0, -7.0, -8.0, -8.0, 1.0])),
            scans: [(scan.to_string(), 3)].into_iter().collect(),
        }
    }

    fn snapshot(tp: &str) -> ColumnSnapshot {
        let mut columns = BTreeMap::new();
        columns.insert(-2, [(5, cell(1.25, "SP01"))].into_iter().collect());
        columns.insert(3, [(-1, cell(0.1, "SP02")), (0, cell(0.3, "SP02"))].into_iter().collect());
        ColumnSnapshot::from_columns(tp, columns)
    }

    #[test]
    fn paths_follow_layout() {
        let store = OutputStore::new("/out", "rainsford");
        assert_eq!(
            store.scan_snapshot_path("00", "SP01", "TP3"),
            PathBuf::from("/out/rainsford/00_SP01_TP3.json")
        );
        assert_eq!(
            store.combined_snapshot_path("00", "TP3"),
            PathBuf::from("/out/rainsford/slice_timepoint/00_TP3.json")
        );
        assert_eq!(
            store.change_set_path("00", "TP1", "TP3"),
            PathBuf::from("/out/rainsford/change/slice_timepoint_pairs/00_TP1_TP3.json")
        );
    }

    #[test]
    fn combined_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "g");
        let snap = snapshot("TP2");

        let path = store.write_combined_snapshot("07", &snap).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let back = store.load_combined_snapshot("07", "TP2").unwrap();
        assert_eq!(back, snap);

        let doc = store.read_snapshot(&path).unwrap();
        assert_eq!(doc.grid_name, "g");
        assert_eq!(doc.slice, "07");
        assert_eq!(doc.scan, None);
    }

    #[test]
    fn scan_snapshot_document_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "g");
        let path = store.write_scan_snapshot("00", "SP01", &snapshot("TP1")).unwrap();
        assert_eq!(path, store.scan_snapshot_path("00", "SP01", "TP1"));

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["scan"], "SP01");
        assert_eq!(value["timepoint"], "TP1");
        assert_eq!(
            value["voxels"]["-2"]["5"],
            serde_json::json!([[0.25, 2.25, 1.25, 1.25, 0.5], [-9.0, -7.0, -8.0, -8.0, 1.0], {"SP01": 3}])
        );
    }

    #[test]
    fn infinite_reflectance_does_not_poison_the_snapshot() {
        use crate::ascii::PointReader;
        use voxelchange_aggregate::ColumnAggregator;
        use voxelchange_core::GridSpec;

        let text = "h\n0.5,1.0,0.5,0,inf,0,0,0,0,0\n0.5,2.0,0.5,0,3.0,0,0,0,0,0\n";
        let grid = GridSpec::new("g", 1.0).unwrap();
        let mut aggregator = ColumnAggregator::new(&grid, "TP1");
        let report = aggregator.ingest(PointReader::from_reader(text.as_bytes()), "SP01");
        assert_eq!(report.accepted, 2);
        let snap = aggregator.finalize();

        let cell = snap.cell(0, 0).unwrap();
        assert_eq!(cell.reflectance.unwrap().to_array(), [3.0, 3.0, 3.0, 3.0, 0.0]);
        assert_eq!(cell.distance.to_array(), [1.0, 2.0, 1.5, 1.5, 0.5]);

        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "g");
        store.write_combined_snapshot("00", &snap).unwrap();
        let back = store.load_combined_snapshot("00", "TP1").unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn extreme_distances_survive_the_store() {
        use voxelchange_aggregate::ColumnAggregator;
        use voxelchange_core::{GridSpec, PointRecord};

        let grid = GridSpec::new("g", 1.0).unwrap();
        let mut aggregator = ColumnAggregator::new(&grid, "TP1");
        for _ in 0..2 {
            aggregator.ingest_point(&PointRecord::new(0.5, 1e308, 0.5), "SP01");
        }
        let snap = aggregator.finalize();
        assert_eq!(snap.cell(0, 0).unwrap().distance.mean, 1e308);

        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "g");
        store.write_combined_snapshot("00", &snap).unwrap();
        assert_eq!(store.load_combined_snapshot("00", "TP1").unwrap(), snap);
    }

    #[test]
    fn missing_snapshot_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "g");
        let err = store.load_combined_snapshot("00", "TP1").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn corrupt_document_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "g");
        let path = store.combined_snapshot_path("00", "TP1");
        atomic_write(&path, b"{\"voxels\":").unwrap();
        let err = store.load_combined_snapshot("00", "TP1").unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/file.json");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert!(!dir.path().join("nested/deep/file.json.tmp").exists());
    }
}
