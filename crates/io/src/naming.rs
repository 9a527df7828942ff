//! Input file naming and project layout discovery.
//!
//! Point files are named `{slice}_{scan}_{timepoint}.txt`, for example
//! `00_SP01_TP3.txt`.

use crate::error::StoreError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use voxelchange_core::Timepoint;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScanFile {
    pub slice: String,
    pub scan: String,
    pub timepoint: String,
    pub path: PathBuf,
}

impl ScanFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let bad_name = || StoreError::FileName(path.to_path_buf());

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(bad_name)?;
        let parts: Vec<&str> = stem.split('_').collect();
        match parts.as_slice() {
            [slice, scan, timepoint] if parts.iter().all(|p| !p.is_empty()) => Ok(Self {
                slice: slice.to_string(),
                scan: scan.to_string(),
                timepoint: timepoint.to_string(),
                path: path.to_path_buf(),
            }),
            _ => Err(bad_name()),
        }
    }
}

fn is_point_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

/// Recursively collects point files under `dir`, sorted by path.
///
/// Files whose names do not follow the convention are logged and skipped.
pub fn discover_scan_files(dir: impl AsRef<Path>) -> Result<Vec<ScanFile>, StoreError> {
    let mut found = Vec::new();
    let mut pending = vec![dir.as_ref().to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|e| StoreError::io(&current, e))?;
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&current, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_point_file(&path) {
                match ScanFile::from_path(&path) {
                    Ok(file) => found.push(file),
                    Err(e) => log::warn!("skipping input: {}", e),
                }
            }
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    log::debug!("discovered {} point files under {}", found.len(), dir.as_ref().display());
    Ok(found)
}

/// Sorts timepoint names chronologically. Names without an ordinal sort
/// after the rest, by name.
pub fn sort_timepoints(names: &mut [String]) {
    names.sort_by(|a, b| match (Timepoint::parse(a.as_str()), Timepoint::parse(b.as_str())) {
        (Ok(ta), Ok(tb)) => ta.cmp(&tb),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
}

/// Which scans exist for each timepoint and slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectStructure {
    /// timepoint -> slice -> scan files
    timepoints: BTreeMap<String, BTreeMap<String, Vec<ScanFile>>>,
}

impl ProjectStructure {
    pub fn from_files(files: impl IntoIterator<Item = ScanFile>) -> Self {
        let mut timepoints: BTreeMap<String, BTreeMap<String, Vec<ScanFile>>> = BTreeMap::new();
        for file in files {
            timepoints
                .entry(file.timepoint.clone())
                .or_default()
                .entry(file.slice.clone())
                .or_default()
                .push(file);
        }
        Self { timepoints }
    }

    pub fn discover(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::from_files(discover_scan_files(dir)?))
    }

    pub fn is_empty(&self) -> bool {
        self.timepoints.is_empty()
    }

    pub fn timepoints(&self) -> &BTreeMap<String, BTreeMap<String, Vec<ScanFile>>> {
        &self.timepoints
    }

    /// Scan names of one slice at one timepoint.
    pub fn scans(&self, timepoint: &str, slice: &str) -> Vec<&str> {
        self.timepoints
            .get(timepoint)
            .and_then(|slices| slices.get(slice))
            .map(|files| files.iter().map(|f| f.scan.as_str()).collect())
            .unwrap_or_default()
    }

    /// Files grouped by `(slice, timepoint)`.
    pub fn groups(&self) -> impl Iterator<Item = ((&str, &str), &[ScanFile])> + '_ {
        self.timepoints.iter().flat_map(|(tp, slices)| {
            slices
                .iter()
                .map(move |(slice, files)| ((slice.as_str(), tp.as_str()), files.as_slice()))
        })
    }

    /// Slice -> its timepoints in chronological order.
    pub fn slices(&self) -> BTreeMap<String, Vec<String>> {
        let mut slices: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (tp, by_slice) in &self.timepoints {
            for slice in by_slice.keys() {
                slices.entry(slice.clone()).or_default().push(tp.clone());
            }
        }
        for tps in slices.values_mut() {
            sort_timepoints(tps);
        }
        slices
    }

    /// Every unordered pair of a slice's timepoints, earlier first.
    pub fn timepoint_pairs(&self, slice: &str) -> Vec<(String, String)> {
        let tps = self.slices().remove(slice).unwrap_or_default();
        tps.iter()
            .enumerate()
            .flat_map(|(i, a)| tps[i + 1..].iter().map(move |b| (a.clone(), b.clone())))
            .collect()
    }
}
