//! GeoJSON boundary payloads.
//!
//! Accepted payloads are `Polygon`, `MultiPolygon`, a `Feature` wrapping one
//! of those, or a `FeatureCollection` whose features all carry polygonal
//! geometries (their polygons are merged into one boundary).
//!
//! Coordinates are walked by hand rather than deserialized into fixed types
//! so that a rejection can name the exact ring and position at fault.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::boundary::{check_ring, Boundary, Polygon, Position, Ring};
use crate::error::GeometryError;

/// Outcome of validating a boundary payload. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryValidation {
    pub valid: bool,

    /// Human-readable reason when `valid` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// The payload's top-level `type` member, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,

    /// Number of polygons found when valid.
    pub polygon_count: usize,
}

/// Validate a payload without raising.
pub fn validate_geometry(value: &Value) -> GeometryValidation {
    let geometry_type = value
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_string);

    match parse_boundary(value) {
        Ok(boundary) => GeometryValidation {
            valid: true,
            reason: None,
            geometry_type,
            polygon_count: boundary.polygons.len(),
        },
        Err(e) => GeometryValidation {
            valid: false,
            reason: Some(e.to_string()),
            geometry_type,
            polygon_count: 0,
        },
    }
}

/// Parse a payload into a validated [`Boundary`].
pub fn parse_boundary(value: &Value) -> Result<Boundary, GeometryError> {
    let polygons = collect_polygons(value, "geometry")?;
    if polygons.is_empty() {
        return Err(GeometryError::Empty("payload has no polygons".to_string()));
    }
    Ok(Boundary { polygons })
}

/// Parse a payload from JSON text.
pub fn parse_boundary_str(s: &str) -> Result<Boundary, GeometryError> {
    let value: Value = serde_json::from_str(s)
        .map_err(|e| GeometryError::MissingField(format!("invalid JSON: {}", e)))?;
    parse_boundary(&value)
}

fn collect_polygons(value: &Value, location: &str) -> Result<Vec<Polygon>, GeometryError> {
    let type_ = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| GeometryError::MissingField(format!("{}.type", location)))?;

    match type_ {
        "Polygon" => {
            let coords = coordinates(value, location)?;
            Ok(vec![parse_polygon(coords, location)?])
        }
        "MultiPolygon" => {
            let coords = coordinates(value, location)?;
            let members = coords.as_array().ok_or_else(|| {
                GeometryError::MissingField(format!("{}.coordinates must be an array", location))
            })?;
            if members.is_empty() {
                return Err(GeometryError::Empty(format!(
                    "{} MultiPolygon has no polygons",
                    location
                )));
            }
            members
                .iter()
                .enumerate()
                .map(|(i, p)| parse_polygon(p, &format!("{} polygon {}", location, i)))
                .collect()
        }
        "Feature" => {
            let geometry = value
                .get("geometry")
                .filter(|g| !g.is_null())
                .ok_or_else(|| GeometryError::MissingField(format!("{}.geometry", location)))?;
            collect_polygons(geometry, &format!("{} feature geometry", location))
        }
        "FeatureCollection" => {
            let features = value
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| GeometryError::MissingField(format!("{}.features", location)))?;
            if features.is_empty() {
                return Err(GeometryError::Empty(
                    "FeatureCollection has no features".to_string(),
                ));
            }
            let mut polygons = Vec::new();
            for (i, feature) in features.iter().enumerate() {
                let location = format!("feature {}", i);
                match feature.get("type").and_then(Value::as_str) {
                    Some("Feature") => polygons.extend(collect_polygons(feature, &location)?),
                    Some(other) => {
                        return Err(GeometryError::UnsupportedType(format!(
                            "{} in {} (expected Feature)",
                            other, location
                        )))
                    }
                    None => return Err(GeometryError::MissingField(format!("{}.type", location))),
                }
            }
            Ok(polygons)
        }
        other => Err(GeometryError::UnsupportedType(other.to_string())),
    }
}

fn coordinates<'a>(value: &'a Value, location: &str) -> Result<&'a Value, GeometryError> {
    value
        .get("coordinates")
        .ok_or_else(|| GeometryError::MissingField(format!("{}.coordinates", location)))
}

fn parse_polygon(value: &Value, location: &str) -> Result<Polygon, GeometryError> {
    let rings = value.as_array().ok_or_else(|| {
        GeometryError::MissingField(format!("{} rings must be an array", location))
    })?;

    let rings = rings
        .iter()
        .enumerate()
        .map(|(r, ring)| parse_ring(ring, &format!("{} ring {}", location, r)))
        .collect::<Result<Vec<Ring>, _>>()?;

    Polygon::from_rings(rings)
        .ok_or_else(|| GeometryError::Empty(format!("{} has no rings", location)))
}

fn parse_ring(value: &Value, location: &str) -> Result<Ring, GeometryError> {
    let positions = value.as_array().ok_or_else(|| {
        GeometryError::MissingField(format!("{} must be an array of positions", location))
    })?;

    let ring = positions
        .iter()
        .enumerate()
        .map(|(i, p)| parse_position(p, &format!("{} position {}", location, i)))
        .collect::<Result<Ring, _>>()?;

    check_ring(&ring, location)?;
    Ok(ring)
}

fn parse_position(value: &Value, location: &str) -> Result<Position, GeometryError> {
    let invalid = |detail: String| GeometryError::InvalidCoordinate {
        location: location.to_string(),
        detail,
    };

    let pair = value
        .as_array()
        .ok_or_else(|| invalid(format!("expected [lng, lat], got {}", value)))?;
    if pair.len() != 2 {
        return Err(invalid(format!(
            "expected 2 numbers, got {} values",
            pair.len()
        )));
    }

    let lon = pair[0]
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(format!("longitude {} is not a finite number", pair[0])))?;
    let lat = pair[1]
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(format!("latitude {} is not a finite number", pair[1])))?;

    Ok([lon, lat])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square_coords() -> Value {
        json!([[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]])
    }

    #[test]
    fn test_polygon_is_valid() {
        let v = validate_geometry(&json!({"type": "Polygon", "coordinates": square_coords()}));
        assert!(v.valid);
        assert_eq!(v.polygon_count, 1);
        assert_eq!(v.geometry_type.as_deref(), Some("Polygon"));
    }

    #[test]
    fn test_feature_collection_merges_polygons() {
        let payload = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Polygon", "coordinates": square_coords()}},
                {"type": "Feature", "properties": {}, "geometry": {"type": "MultiPolygon", "coordinates": [square_coords(), square_coords()]}}
            ]
        });
        let boundary = parse_boundary(&payload).unwrap();
        assert_eq!(boundary.polygons.len(), 3);
    }

    #[test]
    fn test_feature_collection_members_must_be_features() {
        let bare = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Polygon", "coordinates": square_coords()}]
        });
        let v = validate_geometry(&bare);
        assert!(!v.valid);
        assert!(v.reason.unwrap().contains("expected Feature"));

        let nested = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "FeatureCollection",
                "features": [{"type": "Feature", "geometry": {"type": "Polygon", "coordinates": square_coords()}}]
            }]
        });
        assert!(parse_boundary(&nested).is_err());
    }

    #[test]
    fn test_rejects_point() {
        let v = validate_geometry(&json!({"type": "Point", "coordinates": [0.0, 0.0]}));
        assert!(!v.valid);
        assert!(v.reason.unwrap().contains("Unsupported geometry type: Point"));
    }

    #[test]
    fn test_rejects_non_numeric_pair() {
        let v = validate_geometry(&json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], ["a", 0.0], [1.0, 1.0], [0.0, 0.0]]]
        }));
        assert!(!v.valid);
        assert!(v.reason.unwrap().contains("position 1"));
    }

    #[test]
    fn test_rejects_three_value_position() {
        let v = validate_geometry(&json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0, 5.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        }));
        assert!(!v.valid);
    }

    #[test]
    fn test_rejects_short_ring() {
        let v = validate_geometry(&json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]]
        }));
        assert!(!v.valid);
        assert!(v.reason.unwrap().contains("at least 4"));
    }

    #[test]
    fn test_rejects_missing_type() {
        let v = validate_geometry(&json!({"coordinates": square_coords()}));
        assert!(!v.valid);
        assert!(v.geometry_type.is_none());
    }

    #[test]
    fn test_feature_with_null_geometry() {
        let v = validate_geometry(&json!({"type": "Feature", "geometry": null}));
        assert!(!v.valid);
    }
}
