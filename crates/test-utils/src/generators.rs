//! Test data generators for land-cover grids.
//!
//! These generators create predictable lattices whose point counts and
//! class assignments can be verified by hand.

use carbon_common::{CarbonPoint, ClassCode};

/// Cell-center coordinates of an `nx` by `ny` lattice starting at `(min_lng, min_lat)`.
///
/// Point `(col, row)` sits at `min + (index + 0.5) * step`, so no lattice
/// point lies exactly on a boundary drawn along whole multiples of `step`.
pub fn lattice_coords(
    min_lng: f64,
    min_lat: f64,
    step: f64,
    nx: usize,
    ny: usize,
) -> Vec<(usize, usize, f64, f64)> {
    let mut coords = Vec::with_capacity(nx * ny);
    for row in 0..ny {
        for col in 0..nx {
            coords.push((
                col,
                row,
                min_lng + (col as f64 + 0.5) * step,
                min_lat + (row as f64 + 0.5) * step,
            ));
        }
    }
    coords
}

/// Render a lattice as grid CSV text with a header row.
///
/// # Example
///
/// ```
/// use test_utils::lattice_grid_csv;
///
/// let csv = lattice_grid_csv(0.0, 0.0, 1.0, 2, 2, |_, _| 10);
/// assert_eq!(csv.lines().count(), 5); // header + 4 rows
/// ```
pub fn lattice_grid_csv<F>(
    min_lng: f64,
    min_lat: f64,
    step: f64,
    nx: usize,
    ny: usize,
    class_at: F,
) -> String
where
    F: Fn(usize, usize) -> ClassCode,
{
    let mut out = String::from("longitude,latitude,class_code\n");
    for (col, row, lng, lat) in lattice_coords(min_lng, min_lat, step, nx, ny) {
        out.push_str(&format!("{},{},{}\n", lng, lat, class_at(col, row)));
    }
    out
}

/// A lattice where every cell has the same class.
pub fn uniform_grid_csv(
    min_lng: f64,
    min_lat: f64,
    step: f64,
    nx: usize,
    ny: usize,
    class_code: ClassCode,
) -> String {
    lattice_grid_csv(min_lng, min_lat, step, nx, ny, |_, _| class_code)
}

/// A lattice of carbon points with a constant density.
pub fn lattice_carbon_points(
    min_lng: f64,
    min_lat: f64,
    step: f64,
    nx: usize,
    ny: usize,
    class_code: ClassCode,
    carbon_density: f64,
) -> Vec<CarbonPoint> {
    lattice_coords(min_lng, min_lat, step, nx, ny)
        .into_iter()
        .map(|(_, _, longitude, latitude)| CarbonPoint {
            longitude,
            latitude,
            class_code,
            carbon_density,
        })
        .collect()
}
