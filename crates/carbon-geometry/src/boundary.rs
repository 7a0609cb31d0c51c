//! Project boundary model.
//!
//! A [`Boundary`] is always stored as a set of polygons, so a GeoJSON
//! `Polygon` becomes a boundary with one polygon and a `MultiPolygon` keeps
//! each constituent polygon with its own holes.

use carbon_common::BoundingBox;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::GeometryError;

/// A `[longitude, latitude]` position.
pub type Position = [f64; 2];

/// A closed linear ring. The first and last positions coincide.
pub type Ring = Vec<Position>;

/// Minimum number of positions in a closed ring (triangle plus closing point).
pub const MIN_RING_POSITIONS: usize = 4;

/// A polygon with one exterior ring and optional interior holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Ring,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring, holes: Vec<Ring>) -> Self {
        Self { exterior, holes }
    }

    /// Build a polygon from GeoJSON-ordered rings (exterior first).
    pub fn from_rings(mut rings: Vec<Ring>) -> Option<Self> {
        if rings.is_empty() {
            return None;
        }
        let exterior = rings.remove(0);
        Some(Self {
            exterior,
            holes: rings,
        })
    }

    /// All rings, exterior first.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    /// Bounding box of the exterior ring. Holes lie inside it.
    pub fn bounds(&self) -> BoundingBox {
        ring_bounds(&self.exterior)
    }
}

/// A validated project-site boundary (one or more polygons).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub polygons: Vec<Polygon>,
}

impl Boundary {
    /// Create a boundary after checking every ring's structure.
    pub fn new(polygons: Vec<Polygon>) -> Result<Self, GeometryError> {
        let boundary = Self { polygons };
        boundary.check()?;
        Ok(boundary)
    }

    /// Single-polygon boundary from an exterior ring.
    pub fn from_exterior(exterior: Ring) -> Result<Self, GeometryError> {
        Self::new(vec![Polygon::new(exterior, Vec::new())])
    }

    /// Verify ring length, closure and finiteness for every ring.
    pub fn check(&self) -> Result<(), GeometryError> {
        if self.polygons.is_empty() {
            return Err(GeometryError::Empty("boundary has no polygons".to_string()));
        }
        for (p, polygon) in self.polygons.iter().enumerate() {
            for (r, ring) in polygon.rings().enumerate() {
                check_ring(ring, &format!("polygon {} ring {}", p, r))?;
            }
        }
        Ok(())
    }

    pub fn is_multi(&self) -> bool {
        self.polygons.len() > 1
    }

    /// Every position of every ring.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.polygons
            .iter()
            .flat_map(|p| p.rings())
            .flat_map(|r| r.iter())
    }

    /// `[minLng, minLat, maxLng, maxLat]` spanning all rings.
    pub fn bounds(&self) -> BoundingBox {
        self.polygons
            .iter()
            .map(Polygon::bounds)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Render as a GeoJSON geometry object.
    pub fn to_geojson(&self) -> Value {
        let polygon_coords = |p: &Polygon| -> Vec<Ring> { p.rings().cloned().collect() };
        if let [single] = self.polygons.as_slice() {
            json!({ "type": "Polygon", "coordinates": polygon_coords(single) })
        } else {
            let coords: Vec<Vec<Ring>> = self.polygons.iter().map(polygon_coords).collect();
            json!({ "type": "MultiPolygon", "coordinates": coords })
        }
    }
}

pub(crate) fn ring_bounds(ring: &[Position]) -> BoundingBox {
    BoundingBox::from_coords(ring.iter().map(|p| (p[0], p[1])))
        .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0))
}

/// Structural checks shared by the GeoJSON and WKT readers.
pub(crate) fn check_ring(ring: &[Position], location: &str) -> Result<(), GeometryError> {
    if ring.len() < MIN_RING_POSITIONS {
        return Err(GeometryError::RingTooShort {
            location: location.to_string(),
            count: ring.len(),
        });
    }

    if let Some((i, p)) = ring
        .iter()
        .enumerate()
        .find(|(_, p)| !p[0].is_finite() || !p[1].is_finite())
    {
        return Err(GeometryError::InvalidCoordinate {
            location: format!("{} position {}", location, i),
            detail: format!("[{}, {}] is not a pair of finite numbers", p[0], p[1]),
        });
    }

    let first = ring[0];
    let last = ring[ring.len() - 1];
    if first != last {
        return Err(GeometryError::RingNotClosed {
            location: location.to_string(),
        });
    }

    Ok(())
}
