use serde::{Deserialize, Serialize};

/// One surveyed point. `reflectance` is present only when the source row
/// carried the reflectance-bearing schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub reflectance: Option<f64>,
}

impl PointRecord {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            reflectance: None,
        }
    }

    pub fn with_reflectance(mut self, reflectance: f64) -> Self {
        self.reflectance = Some(reflectance);
        self
    }

    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn is_finite(&self) -> bool {
        self.position().iter().all(|v| v.is_finite())
    }

    /// The sample aggregated as "distance": the geographic-y coordinate.
    pub fn distance(&self) -> f64 {
        self.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    Distance,
    Reflectance,
}

impl MeasurementKind {
    pub const ALL: [MeasurementKind; 2] = [MeasurementKind::Distance, MeasurementKind::Reflectance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Reflectance => "reflectance",
        }
    }
}
