//! Project boundary geometry for carbon stock estimation.
//!
//! - **Validation**: GeoJSON (`Polygon`, `MultiPolygon`, `Feature`,
//!   `FeatureCollection`) and WKT input, with a specific reason on rejection
//! - **Calculation**: area in hectares, bounds, overlap with a reference layer
//! - **Filtering**: bounding-box prefilter plus exact point-in-polygon
//!
//! # Example
//!
//! ```ignore
//! use carbon_geometry::{parse_boundary, PreparedBoundary};
//!
//! let boundary = parse_boundary(&payload)?;
//! let prepared = PreparedBoundary::new(&boundary);
//! let inside = prepared.filter(&points, 50_000);
//! println!("{} ha, {} points", boundary.area_ha(), inside.len());
//! ```

pub mod area;
pub mod boundary;
pub mod contains;
pub mod error;
pub mod filter;
pub mod geojson;
pub mod overlap;
pub mod wkt;

pub use boundary::{Boundary, Polygon, Position, Ring};
pub use contains::{locate_in_ring, RingLocation};
pub use error::GeometryError;
pub use filter::{FilteredDataset, PreparedBoundary, DEFAULT_PARALLEL_THRESHOLD};
pub use geojson::{parse_boundary, parse_boundary_str, validate_geometry, GeometryValidation};
pub use overlap::{
    compute_overlap, overlap_with_reference, OverlapResult, DEFAULT_SAMPLE_RESOLUTION,
    MAX_SAMPLE_RESOLUTION,
};
