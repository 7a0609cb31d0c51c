//! Surface area in hectares.
//!
//! Area uses the shoelace formula on a local equirectangular projection.
//! Each polygon is scaled by the cosine of the mean latitude of its exterior
//! ring, so results are planar approximations that stay within a fraction
//! of a percent of geodesic values for project-sized boundaries.

use carbon_common::BoundingBox;

use crate::boundary::{Boundary, Polygon, Position};

/// Meters per degree of longitude at the equator.
pub const METERS_PER_DEGREE_LON: f64 = 111_320.0;

/// Meters per degree of latitude.
pub const METERS_PER_DEGREE_LAT: f64 = 110_574.0;

const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Square meters represented by one square degree at latitude `lat`.
#[inline]
pub fn square_meters_per_square_degree(lat: f64) -> f64 {
    METERS_PER_DEGREE_LON * lat.to_radians().cos() * METERS_PER_DEGREE_LAT
}

/// Unsigned shoelace area of a ring in square degrees.
pub fn ring_area_sq_degrees(ring: &[Position]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for w in ring.windows(2) {
        twice_area += w[0][0] * w[1][1] - w[1][0] * w[0][1];
    }
    // Tolerate rings that are not explicitly closed.
    let (first, last) = (ring[0], ring[ring.len() - 1]);
    if first != last {
        twice_area += last[0] * first[1] - first[0] * last[1];
    }
    (twice_area / 2.0).abs()
}

/// Mean latitude of a ring, ignoring the closing position.
fn mean_latitude(ring: &[Position]) -> f64 {
    let open = match ring.split_last() {
        Some((last, rest)) if !rest.is_empty() && *last == rest[0] => rest,
        _ => ring,
    };
    if open.is_empty() {
        return 0.0;
    }
    open.iter().map(|p| p[1]).sum::<f64>() / open.len() as f64
}

impl Polygon {
    /// Area in hectares: exterior minus holes, never negative.
    pub fn area_ha(&self) -> f64 {
        let scale = square_meters_per_square_degree(mean_latitude(&self.exterior));
        let exterior = ring_area_sq_degrees(&self.exterior);
        let holes: f64 = self.holes.iter().map(|h| ring_area_sq_degrees(h)).sum();
        ((exterior - holes).max(0.0) * scale) / SQUARE_METERS_PER_HECTARE
    }
}

impl Boundary {
    /// Sum of the constituent polygon areas in hectares.
    pub fn area_ha(&self) -> f64 {
        self.polygons.iter().map(Polygon::area_ha).sum()
    }
}

/// Projected area of a bounding box in hectares, scaled at its center latitude.
pub fn bbox_area_ha(bbox: &BoundingBox) -> f64 {
    let center_lat = (bbox.min_y + bbox.max_y) / 2.0;
    bbox.width().max(0.0) * bbox.height().max(0.0) * square_meters_per_square_degree(center_lat)
        / SQUARE_METERS_PER_HECTARE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Position> {
        vec![
            [x, y],
            [x + size, y],
            [x + size, y + size],
            [x, y + size],
            [x, y],
        ]
    }

    #[test]
    fn test_ring_area_sq_degrees() {
        assert!((ring_area_sq_degrees(&square(0.0, 0.0, 2.0)) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_equator_square_hectares() {
        // 0.01 deg square centered near the equator: 1113.2 m x 1105.74 m
        let polygon = Polygon::new(square(0.0, -0.005, 0.01), Vec::new());
        let expected = 1113.2 * 1105.74 / 10_000.0;
        assert!((polygon.area_ha() - expected).abs() < 0.01);
    }

    #[test]
    fn test_winding_invariance() {
        let ccw = square(10.0, 45.0, 0.1);
        let mut cw = ccw.clone();
        cw.reverse();
        let a = Polygon::new(ccw, Vec::new()).area_ha();
        let b = Polygon::new(cw, Vec::new()).area_ha();
        assert!(a > 0.0);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_hole_is_subtracted() {
        let mut hole = square(0.25, 0.25, 0.5);
        hole.reverse();
        let solid = Polygon::new(square(0.0, 0.0, 1.0), Vec::new());
        let holed = Polygon::new(square(0.0, 0.0, 1.0), vec![hole]);
        let ratio = holed.area_ha() / solid.area_ha();
        assert!((ratio - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_area_shrinks_with_latitude() {
        let equator = Polygon::new(square(0.0, -0.05, 0.1), Vec::new()).area_ha();
        let north = Polygon::new(square(0.0, 59.95, 0.1), Vec::new()).area_ha();
        assert!((north / equator - 0.5).abs() < 0.01);
    }
}
