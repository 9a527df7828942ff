use crate::error::GridError;
use crate::index::VoxelIndex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Grid definition shared by every timepoint of a project.
///
/// `voxel_size` is the edge length of a cubic voxel. The offsets shift the
/// grid origin before floor division; all three default to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGridSpec")]
pub struct GridSpec {
    pub name: String,
    pub voxel_size: f64,
    pub x_offset: f64,
    pub y_offset: f64,
    pub z_offset: f64,
}

#[derive(Deserialize)]
struct RawGridSpec {
    #[serde(default)]
    name: String,
    voxel_size: f64,
    #[serde(default)]
    x_offset: f64,
    #[serde(default)]
    y_offset: f64,
    #[serde(default)]
    z_offset: f64,
}

impl TryFrom<RawGridSpec> for GridSpec {
    type Error = GridError;

    fn try_from(raw: RawGridSpec) -> Result<Self, Self::Error> {
        GridSpec::new(raw.name, raw.voxel_size)?.with_offsets(raw.x_offset, raw.y_offset, raw.z_offset)
    }
}

impl GridSpec {
    pub fn new(name: impl Into<String>, voxel_size: f64) -> Result<Self, GridError> {
        if !voxel_size.is_finite() || voxel_size <= 0.0 {
            return Err(GridError::InvalidVoxelSize(voxel_size));
        }
        Ok(Self {
            name: name.into(),
            voxel_size,
            x_offset: 0.0,
            y_offset: 0.0,
            z_offset: 0.0,
        })
    }

    pub fn with_offsets(mut self, x: f64, y: f64, z: f64) -> Result<Self, GridError> {
        for (key, value) in [("x_offset", x), ("y_offset", y), ("z_offset", z)] {
            if !value.is_finite() {
                return Err(GridError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        self.x_offset = x;
        self.y_offset = y;
        self.z_offset = z;
        Ok(self)
    }

    /// Loads a grid specification from disk.
    ///
    /// Files ending in `.json` are parsed as JSON. Anything else is read as
    /// `key=value` lines (`voxel_size`, `name`, `x_offset`, `y_offset`,
    /// `z_offset`), ignoring blank lines and `#` comments.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GridError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| GridError::SpecRead {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            return serde_json::from_str(&text).map_err(|source| GridError::SpecParse {
                path: path.to_path_buf(),
                source,
            });
        }

        Self::from_key_values(&text, path)
    }

    fn from_key_values(text: &str, path: &Path) -> Result<Self, GridError> {
        let mut name = String::new();
        let mut voxel_size = None;
        let mut offsets = [0.0f64; 3];

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                log::warn!("ignoring grid specification line without `=`: {}", trimmed);
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');

            match key {
                "name" => name = value.to_string(),
                "voxel_size" => voxel_size = Some(parse_number(key, value)?),
                "x_offset" => offsets[0] = parse_number(key, value)?,
                "y_offset" => offsets[1] = parse_number(key, value)?,
                "z_offset" => offsets[2] = parse_number(key, value)?,
                other => log::debug!("ignoring unknown grid specification key `{}`", other),
            }
        }

        let voxel_size = voxel_size.ok_or_else(|| GridError::MissingVoxelSize(path.to_path_buf()))?;
        Self::new(name, voxel_size)?.with_offsets(offsets[0], offsets[1], offsets[2])
    }

    pub fn index(&self) -> VoxelIndex {
        VoxelIndex::from_spec(self)
    }

    /// Volume of a voxel-column slab whose thickness is `dimension`.
    pub fn voxel_volume(&self, dimension: f64) -> f64 {
        dimension * self.voxel_size * self.voxel_size
    }

    /// Height of the bottom face of voxel row `row`.
    pub fn row_height(&self, row: i64) -> f64 {
        row as f64 * self.voxel_size
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, GridError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GridError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}
