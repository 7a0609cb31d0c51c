//! Overlap between a project boundary and a reference layer.
//!
//! The intersection area is estimated by sampling cell centers on a regular
//! lattice over the intersection of the two bounding boxes. A sample counts
//! when it lies in both boundaries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::area::bbox_area_ha;
use crate::boundary::Boundary;
use crate::filter::PreparedBoundary;
use crate::geojson::parse_boundary;

/// Default number of lattice samples along each axis.
pub const DEFAULT_SAMPLE_RESOLUTION: usize = 200;

/// Upper bound on lattice samples per axis; sampling costs `resolution²`.
pub const MAX_SAMPLE_RESOLUTION: usize = 2000;

/// Overlap of a project boundary with a reference boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapResult {
    pub has_overlap: bool,
    pub overlap_area_ha: f64,
    /// Share of the project area covered by the reference, 0 to 100.
    pub overlap_percentage: f64,
}

impl OverlapResult {
    pub fn none() -> Self {
        Self {
            has_overlap: false,
            overlap_area_ha: 0.0,
            overlap_percentage: 0.0,
        }
    }
}

/// Overlap against a reference payload that may be missing or invalid.
///
/// A missing or invalid reference degrades to no overlap rather than failing.
pub fn overlap_with_reference(
    project: &Boundary,
    reference: Option<&Value>,
    resolution: usize,
) -> OverlapResult {
    let Some(reference) = reference.filter(|v| !v.is_null()) else {
        warn!("Reference boundary unavailable, reporting no overlap");
        return OverlapResult::none();
    };

    match parse_boundary(reference) {
        Ok(reference) => compute_overlap(project, &reference, resolution),
        Err(e) => {
            warn!(error = %e, "Reference boundary invalid, reporting no overlap");
            OverlapResult::none()
        }
    }
}

/// Overlap of two validated boundaries, relative to `project`'s area.
pub fn compute_overlap(project: &Boundary, reference: &Boundary, resolution: usize) -> OverlapResult {
    let resolution = resolution.clamp(1, MAX_SAMPLE_RESOLUTION);
    let project_prepared = PreparedBoundary::new(project);
    let reference_prepared = PreparedBoundary::new(reference);

    let Some(window) = project_prepared
        .bbox()
        .intersection(reference_prepared.bbox())
    else {
        return OverlapResult::none();
    };

    let dx = window.width() / resolution as f64;
    let dy = window.height() / resolution as f64;
    let mut hits = 0usize;
    for j in 0..resolution {
        let y = window.min_y + (j as f64 + 0.5) * dy;
        for i in 0..resolution {
            let x = window.min_x + (i as f64 + 0.5) * dx;
            if project_prepared.contains(x, y) && reference_prepared.contains(x, y) {
                hits += 1;
            }
        }
    }

    let total = resolution * resolution;
    let overlap_area_ha = bbox_area_ha(&window) * hits as f64 / total as f64;

    // Thin slivers can fall between samples; vertices still reveal contact.
    let touches = hits > 0
        || project
            .positions()
            .any(|p| reference_prepared.contains(p[0], p[1]))
        || reference
            .positions()
            .any(|p| project_prepared.contains(p[0], p[1]));

    let project_area = project.area_ha();
    let overlap_percentage = if project_area > 0.0 {
        (overlap_area_ha / project_area * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    debug!(
        samples = total,
        hits,
        overlap_area_ha,
        overlap_percentage,
        "Computed boundary overlap"
    );

    OverlapResult {
        has_overlap: touches,
        overlap_area_ha,
        overlap_percentage,
    }
}
