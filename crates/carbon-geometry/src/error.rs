//! Errors raised while parsing or validating a boundary.

use carbon_common::CarbonError;
use thiserror::Error;

/// Structural problems with a boundary payload.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeometryError {
    /// The payload is not a Polygon, MultiPolygon, Feature or FeatureCollection.
    #[error("Unsupported geometry type: {0}")]
    UnsupportedType(String),

    /// A required member is absent or has the wrong JSON type.
    #[error("Missing or malformed field: {0}")]
    MissingField(String),

    /// A coordinate pair is not two finite numbers.
    #[error("Invalid coordinate at {location}: {detail}")]
    InvalidCoordinate { location: String, detail: String },

    /// A linear ring has fewer than 4 positions.
    #[error("Ring {location} has {count} coordinate pairs, at least 4 are required")]
    RingTooShort { location: String, count: usize },

    /// A linear ring does not end where it starts.
    #[error("Ring {location} is not closed: first and last coordinates differ")]
    RingNotClosed { location: String },

    /// The payload contains no polygons.
    #[error("Geometry contains no polygons: {0}")]
    Empty(String),

    /// Invalid WKT text.
    #[error("Invalid WKT format: {0}")]
    InvalidWkt(String),
}

impl From<GeometryError> for CarbonError {
    fn from(err: GeometryError) -> Self {
        CarbonError::InvalidGeometry(err.to_string())
    }
}
