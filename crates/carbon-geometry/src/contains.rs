//! Exact point-in-polygon tests.
//!
//! Edge policy is boundary-inclusive: a point on an exterior edge or vertex
//! is inside, and a point on a hole edge is also inside (the hole's edge
//! belongs to the polygon). Only points strictly inside a hole are removed.

use crate::boundary::{Boundary, Polygon, Position};

/// Tolerance on the cross product when deciding that a point is on an edge.
pub const EDGE_EPSILON: f64 = 1e-12;

/// Where a point lies relative to a single ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingLocation {
    Inside,
    OnEdge,
    Outside,
}

/// Whether `(x, y)` lies on segment `a`-`b`.
#[inline]
fn on_segment(x: f64, y: f64, a: Position, b: Position) -> bool {
    let cross = (b[0] - a[0]) * (y - a[1]) - (b[1] - a[1]) * (x - a[0]);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    x >= a[0].min(b[0]) - EDGE_EPSILON
        && x <= a[0].max(b[0]) + EDGE_EPSILON
        && y >= a[1].min(b[1]) - EDGE_EPSILON
        && y <= a[1].max(b[1]) + EDGE_EPSILON
}

/// Classify a point against a closed ring using ray casting.
pub fn locate_in_ring(x: f64, y: f64, ring: &[Position]) -> RingLocation {
    let n = ring.len();
    if n < 3 {
        return RingLocation::Outside;
    }

    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let pi = ring[i];
        let pj = ring[j];

        if on_segment(x, y, pj, pi) {
            return RingLocation::OnEdge;
        }

        let (xi, yi) = (pi[0], pi[1]);
        let (xj, yj) = (pj[0], pj[1]);
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    if inside {
        RingLocation::Inside
    } else {
        RingLocation::Outside
    }
}

impl Polygon {
    /// Inside the exterior ring (edges included) and not strictly inside any hole.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        match locate_in_ring(x, y, &self.exterior) {
            RingLocation::Outside => false,
            RingLocation::OnEdge => true,
            RingLocation::Inside => self
                .holes
                .iter()
                .all(|hole| locate_in_ring(x, y, hole) != RingLocation::Inside),
        }
    }
}

impl Boundary {
    /// Exact containment test without any bounding-box prefilter.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.polygons.iter().any(|p| p.contains_point(x, y))
    }
}
