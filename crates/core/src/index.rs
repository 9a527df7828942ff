use crate::error::GridError;
use crate::grid::GridSpec;

/// Integer voxel coordinates of a point.
///
/// `col` and `row` key the column store. `row_aux` is the floor of the
/// geographic-y coordinate; it is computed for every point but is not part
/// of any lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoxelCoord {
    pub col: i64,
    pub row_aux: i64,
    pub row: i64,
}

impl VoxelCoord {
    pub fn key(&self) -> (i64, i64) {
        (self.col, self.row)
    }
}

/// Maps world coordinates to voxel coordinates by floor division.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelIndex {
    voxel_size: f64,
    offsets: [f64; 3],
}

impl VoxelIndex {
    pub fn new(voxel_size: f64) -> Result<Self, GridError> {
        GridSpec::new("", voxel_size).map(|spec| Self::from_spec(&spec))
    }

    pub(crate) fn from_spec(spec: &GridSpec) -> Self {
        Self {
            voxel_size: spec.voxel_size,
            offsets: [spec.x_offset, spec.y_offset, spec.z_offset],
        }
    }

    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    pub fn index(&self, x: f64, y: f64, z: f64) -> VoxelCoord {
        VoxelCoord {
            col: self.axis(x, 0),
            row_aux: self.axis(y, 1),
            row: self.axis(z, 2),
        }
    }

    fn axis(&self, value: f64, axis: usize) -> i64 {
        ((value - self.offsets[axis]) / self.voxel_size).floor() as i64
    }
}
