//! Land-cover class to carbon density lookup.
//!
//! The built-in table follows the ESA WorldCover legend. Densities are
//! above-ground carbon in Mg C/ha. Codes missing from the table resolve to
//! [`EngineConfig::default_carbon_density`] and the label `"Unknown"`.

use std::collections::BTreeMap;

use carbon_common::{CarbonPoint, ClassCode, GridPoint};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// Label reported for class codes missing from the table.
pub const UNKNOWN_CLASS_LABEL: &str = "Unknown";

/// One row of the density table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub label: String,
    pub carbon_density: f64,
    pub forest: bool,
}

impl ClassInfo {
    fn new(label: &str, carbon_density: f64, forest: bool) -> Self {
        Self {
            label: label.to_string(),
            carbon_density,
            forest,
        }
    }
}

/// Immutable class code → carbon density table.
#[derive(Debug, Clone, PartialEq)]
pub struct CarbonDensityTable {
    classes: BTreeMap<ClassCode, ClassInfo>,
    default_density: f64,
}

impl CarbonDensityTable {
    /// ESA WorldCover classes with the given fallback density.
    pub fn worldcover(default_density: f64) -> Self {
        let classes = BTreeMap::from([
            (10, ClassInfo::new("Tree cover", 120.0, true)),
            (20, ClassInfo::new("Shrubland", 40.0, false)),
            (30, ClassInfo::new("Grassland", 25.0, false)),
            (40, ClassInfo::new("Cropland", 20.0, false)),
            (50, ClassInfo::new("Built-up", 5.0, false)),
            (60, ClassInfo::new("Bare / sparse vegetation", 2.0, false)),
            (70, ClassInfo::new("Snow and ice", 0.0, false)),
            (80, ClassInfo::new("Permanent water bodies", 0.0, false)),
            (90, ClassInfo::new("Herbaceous wetland", 60.0, false)),
            (95, ClassInfo::new("Mangroves", 150.0, true)),
            (100, ClassInfo::new("Moss and lichen", 10.0, false)),
        ]);
        Self {
            classes,
            default_density,
        }
    }

    /// Built-in table with the configured fallback and overrides applied.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut table = Self::worldcover(config.default_carbon_density);
        for (&code, &density) in &config.density_overrides {
            table
                .classes
                .entry(code)
                .and_modify(|c| c.carbon_density = density)
                .or_insert_with(|| ClassInfo {
                    label: format!("Class {}", code),
                    carbon_density: density,
                    forest: false,
                });
        }
        table
    }

    /// Carbon density for a class code, falling back to the default.
    #[inline]
    pub fn density(&self, code: ClassCode) -> f64 {
        self.classes
            .get(&code)
            .map_or(self.default_density, |c| c.carbon_density)
    }

    pub fn label(&self, code: ClassCode) -> &str {
        self.classes
            .get(&code)
            .map_or(UNKNOWN_CLASS_LABEL, |c| c.label.as_str())
    }

    pub fn is_forest(&self, code: ClassCode) -> bool {
        self.classes.get(&code).is_some_and(|c| c.forest)
    }

    /// Attach densities to a stream of grid points.
    pub fn reclassify<'a, I>(&'a self, points: I) -> impl Iterator<Item = CarbonPoint> + 'a
    where
        I: IntoIterator<Item = GridPoint>,
        I::IntoIter: 'a,
    {
        points
            .into_iter()
            .map(move |p| p.with_density(self.density(p.class_code)))
    }
}

impl Default for CarbonDensityTable {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
