//! Grid cell types for land-cover classification data.

use serde::{Deserialize, Serialize};

/// Land use / land cover class code assigned to a grid cell.
pub type ClassCode = u16;

/// A raw grid cell parsed from a classification grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub class_code: ClassCode,
}

impl GridPoint {
    pub fn new(longitude: f64, latitude: f64, class_code: ClassCode) -> Self {
        Self {
            longitude,
            latitude,
            class_code,
        }
    }

    /// Attach a carbon density, keeping coordinates and class code.
    pub fn with_density(self, carbon_density: f64) -> CarbonPoint {
        CarbonPoint {
            longitude: self.longitude,
            latitude: self.latitude,
            class_code: self.class_code,
            carbon_density,
        }
    }
}

/// A grid cell after reclassification to carbon density (Mg C/ha).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarbonPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub class_code: ClassCode,
    pub carbon_density: f64,
}

