//! Carbon statistics over a filtered point set.

use std::collections::BTreeMap;

use carbon_common::{BoundingBox, CarbonPoint, ClassCode};
use carbon_geometry::FilteredDataset;
use serde::{Deserialize, Serialize};

use crate::reclassify::CarbonDensityTable;

/// Count and carbon sum for one land-cover class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub count: usize,
    pub sum_carbon: f64,
}

/// Per-class and total carbon for a set of points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonStatistics {
    pub total_carbon: f64,
    pub point_count: usize,
    pub per_class: BTreeMap<ClassCode, ClassStats>,
    /// Extent of the points themselves, not of the boundary.
    pub point_bounds: Option<BoundingBox>,
}

impl CarbonStatistics {
    /// Aggregate a filtered dataset.
    pub fn from_dataset(dataset: &FilteredDataset) -> Self {
        Self::from_points(&dataset.points)
    }

    /// Aggregate any point slice.
    pub fn from_points(points: &[CarbonPoint]) -> Self {
        let mut stats = Self::default();
        for p in points {
            stats.add(p);
        }
        stats
    }

    fn add(&mut self, p: &CarbonPoint) {
        let entry = self.per_class.entry(p.class_code).or_default();
        entry.count += 1;
        entry.sum_carbon += p.carbon_density;

        self.total_carbon += p.carbon_density;
        self.point_count += 1;

        match self.point_bounds.as_mut() {
            Some(b) => b.expand_to_include(p.longitude, p.latitude),
            None => {
                self.point_bounds = Some(BoundingBox::new(
                    p.longitude,
                    p.latitude,
                    p.longitude,
                    p.latitude,
                ))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    /// Mean carbon density per point, 0 for an empty set.
    pub fn mean_density(&self) -> f64 {
        if self.point_count == 0 {
            0.0
        } else {
            self.total_carbon / self.point_count as f64
        }
    }

    /// Carbon held by classes the table flags as forest.
    pub fn forest_carbon(&self, table: &CarbonDensityTable) -> f64 {
        self.per_class
            .iter()
            .filter(|(code, _)| table.is_forest(**code))
            .map(|(_, s)| s.sum_carbon)
            .sum()
    }

    /// Share of total carbon per class, in percent.
    pub fn carbon_shares(&self) -> BTreeMap<ClassCode, f64> {
        self.per_class
            .iter()
            .map(|(code, s)| {
                let share = if self.total_carbon > 0.0 {
                    s.sum_carbon / self.total_carbon * 100.0
                } else {
                    0.0
                };
                (*code, share)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64, class_code: ClassCode, carbon_density: f64) -> CarbonPoint {
        CarbonPoint {
            longitude: x,
            latitude: y,
            class_code,
            carbon_density,
        }
    }

    #[test]
    fn test_aggregate_per_class() {
        let stats = CarbonStatistics::from_points(&[
            pt(0.0, 0.0, 10, 120.0),
            pt(1.0, 2.0, 10, 120.0),
            pt(-1.0, 0.5, 30, 25.0),
        ]);
        assert_eq!(stats.point_count, 3);
        assert_eq!(stats.total_carbon, 265.0);
        assert_eq!(stats.per_class[&10], ClassStats { count: 2, sum_carbon: 240.0 });
        assert_eq!(stats.per_class[&30].count, 1);
        assert_eq!(stats.point_bounds.unwrap().to_array(), [-1.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_empty() {
        let stats = CarbonStatistics::from_points(&[]);
        assert!(stats.is_empty());
        assert!(stats.point_bounds.is_none());
        assert_eq!(stats.mean_density(), 0.0);
    }

    #[test]
    fn test_forest_carbon_and_shares() {
        let table = CarbonDensityTable::default();
        let stats = CarbonStatistics::from_points(&[
            pt(0.0, 0.0, 10, 120.0),
            pt(0.0, 0.0, 95, 150.0),
            pt(0.0, 0.0, 40, 30.0),
        ]);
        assert_eq!(stats.forest_carbon(&table), 270.0);
        let shares = stats.carbon_shares();
        assert!((shares[&40] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_serializes_camel_case() {
        let stats = CarbonStatistics::from_points(&[pt(0.0, 0.0, 10, 1.0)]);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["pointCount"], 1);
        assert_eq!(json["perClass"]["10"]["sumCarbon"], 1.0);
    }
}
