use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use voxelchange_core::GridSpec;
use voxelchange_io::OutputStore;

fn default_combine_scans() -> bool {
    true
}

/// Project settings loaded from a JSON file.
///
/// ```json
/// {
///   "grid": { "name": "rainsford", "voxel_size": 0.05 },
///   "input_dir": "input/pointclouds",
///   "output_root": "output",
///   "workers": 4
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub grid: GridSpec,
    pub input_dir: PathBuf,
    pub output_root: PathBuf,
    /// Worker threads; rayon's default when absent.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Merge all scans of a slice and timepoint into one snapshot.
    #[serde(default = "default_combine_scans")]
    pub combine_scans: bool,
}

impl ProjectConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BatchError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| BatchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| BatchError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn store(&self) -> OutputStore {
        OutputStore::new(&self.output_root, &self.grid.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        fs::write(
            &path,
            r#"{"grid": {"name": "g", "voxel_size": 0.5}, "input_dir": "in", "output_root": "out"}"#,
        )
        .unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.grid.voxel_size, 0.5);
        assert_eq!(config.workers, None);
        assert!(config.combine_scans);
        assert_eq!(config.store().grid_dir(), PathBuf::from("out/g"));
    }

    #[test]
    fn invalid_voxel_size_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        fs::write(
            &path,
            r#"{"grid": {"voxel_size": 0}, "input_dir": "in", "output_root": "out"}"#,
        )
        .unwrap();
        assert!(matches!(
            ProjectConfig::load(&path),
            Err(BatchError::ConfigParse { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ProjectConfig::load(dir.path().join("none.json")),
            Err(BatchError::ConfigRead { .. })
        ));
    }
}
