//! Spatial filtering of grid points against a boundary.
//!
//! Every point goes through a two-stage test:
//!
//! ```text
//! point ──► overall bbox? ──no──► reject (O(1))
//!               │yes
//!               ▼
//!          polygon bbox? ──no──► next polygon
//!               │yes
//!               ▼
//!          exact ray cast (exterior, then holes)
//! ```

use carbon_common::{BoundingBox, CarbonPoint};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::boundary::{Boundary, Polygon};

/// Default input size above which filtering runs on the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 50_000;

/// A boundary with its bounding boxes computed once for repeated tests.
#[derive(Debug, Clone)]
pub struct PreparedBoundary {
    polygons: Vec<(BoundingBox, Polygon)>,
    bbox: BoundingBox,
}

impl PreparedBoundary {
    pub fn new(boundary: &Boundary) -> Self {
        let polygons: Vec<(BoundingBox, Polygon)> = boundary
            .polygons
            .iter()
            .map(|p| (p.bounds(), p.clone()))
            .collect();
        Self {
            bbox: boundary.bounds(),
            polygons,
        }
    }

    /// Overall bounding box used as the first-stage filter.
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Bounding-box prefilter followed by the exact test.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if !self.bbox.contains_point(x, y) {
            return false;
        }
        self.polygons
            .iter()
            .any(|(bbox, polygon)| bbox.contains_point(x, y) && polygon.contains_point(x, y))
    }

    /// Lazily yield the points inside the boundary, in input order.
    pub fn filter_iter<'a, I>(&'a self, points: I) -> impl Iterator<Item = CarbonPoint> + 'a
    where
        I: IntoIterator<Item = CarbonPoint>,
        I::IntoIter: 'a,
    {
        points
            .into_iter()
            .filter(move |p| self.contains(p.longitude, p.latitude))
    }

    /// Points inside the boundary, in input order.
    ///
    /// Inputs longer than `parallel_threshold` are split across the rayon
    /// pool; the indexed collect keeps the original ordering.
    pub fn filter(&self, points: &[CarbonPoint], parallel_threshold: usize) -> Vec<CarbonPoint> {
        let kept: Vec<CarbonPoint> = if points.len() > parallel_threshold {
            points
                .par_iter()
                .filter(|p| self.contains(p.longitude, p.latitude))
                .copied()
                .collect()
        } else {
            self.filter_iter(points.iter().copied()).collect()
        };

        debug!(
            input = points.len(),
            kept = kept.len(),
            "Filtered points against boundary"
        );
        kept
    }
}

/// Points known to lie inside a boundary, tagged with their source year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredDataset {
    pub year: i32,
    pub points: Vec<CarbonPoint>,
}

impl FilteredDataset {
    /// Wrap points already filtered against a boundary.
    pub fn new(year: i32, points: Vec<CarbonPoint>) -> Self {
        Self { year, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::Polygon;

    fn pt(x: f64, y: f64) -> CarbonPoint {
        CarbonPoint {
            longitude: x,
            latitude: y,
            class_code: 10,
            carbon_density: 1.0,
        }
    }

    fn square(x: f64, y: f64, size: f64) -> Vec<[f64; 2]> {
        vec![
            [x, y],
            [x + size, y],
            [x + size, y + size],
            [x, y + size],
            [x, y],
        ]
    }

    #[test]
    fn test_filter_preserves_order() {
        let boundary = Boundary::from_exterior(square(0.0, 0.0, 10.0)).unwrap();
        let prepared = PreparedBoundary::new(&boundary);
        let points = vec![pt(9.0, 9.0), pt(20.0, 0.0), pt(1.0, 1.0), pt(5.0, 5.0)];
        let kept = prepared.filter(&points, DEFAULT_PARALLEL_THRESHOLD);
        assert_eq!(kept, vec![pt(9.0, 9.0), pt(1.0, 1.0), pt(5.0, 5.0)]);
    }

    #[test]
    fn test_parallel_and_serial_agree() {
        let boundary = Boundary::from_exterior(square(0.0, 0.0, 10.0)).unwrap();
        let prepared = PreparedBoundary::new(&boundary);
        let points: Vec<CarbonPoint> = (0..400)
            .map(|i| pt((i % 20) as f64 - 5.0, (i / 20) as f64 - 5.0))
            .collect();
        let serial = prepared.filter(&points, usize::MAX);
        let parallel = prepared.filter(&points, 0);
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_multipolygon_union() {
        let boundary = Boundary::new(vec![
            Polygon::new(square(0.0, 0.0, 1.0), Vec::new()),
            Polygon::new(square(5.0, 5.0, 1.0), Vec::new()),
        ])
        .unwrap();
        let prepared = PreparedBoundary::new(&boundary);
        assert!(prepared.contains(0.5, 0.5));
        assert!(prepared.contains(5.5, 5.5));
        // Inside the overall bbox but in neither polygon
        assert!(!prepared.contains(3.0, 3.0));
    }

    #[test]
    fn test_dataset_tagged_with_year() {
        let boundary = Boundary::from_exterior(square(0.0, 0.0, 1.0)).unwrap();
        let prepared = PreparedBoundary::new(&boundary);
        let ds = FilteredDataset::new(2021, prepared.filter(&[pt(0.5, 0.5), pt(2.0, 2.0)], 10));
        assert_eq!(ds.year, 2021);
        assert_eq!(ds.len(), 1);
    }
}
