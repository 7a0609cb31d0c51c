//! WKT boundary input.
//!
//! Accepts formats:
//! - `POLYGON((lon1 lat1, lon2 lat2, lon3 lat3, lon1 lat1))`
//! - `POLYGON((outer...),(hole...))`
//! - `MULTIPOLYGON(((ring1)),((ring2),(hole2)))`

use crate::boundary::{check_ring, Boundary, Polygon, Position, Ring};
use crate::error::GeometryError;

impl Boundary {
    /// Parse a WKT POLYGON or MULTIPOLYGON string.
    pub fn from_wkt(wkt: &str) -> Result<Self, GeometryError> {
        let wkt = wkt.trim();
        let upper = wkt.to_uppercase();

        let polygons = if upper.starts_with("MULTIPOLYGON") {
            let body = outer_body(&wkt["MULTIPOLYGON".len()..])?;
            let groups = split_groups(body)?;
            if groups.is_empty() {
                return Err(GeometryError::InvalidWkt(
                    "MULTIPOLYGON must contain at least one polygon".to_string(),
                ));
            }
            groups
                .iter()
                .enumerate()
                .map(|(i, g)| parse_polygon_body(g, &format!("polygon {}", i)))
                .collect::<Result<Vec<_>, _>>()?
        } else if upper.starts_with("POLYGON") {
            let body = outer_body(&wkt["POLYGON".len()..])?;
            vec![parse_polygon_body(body, "polygon 0")?]
        } else {
            return Err(GeometryError::InvalidWkt(
                "Expected POLYGON or MULTIPOLYGON format".to_string(),
            ));
        };

        Boundary::new(polygons)
    }
}

/// Strip the outermost parentheses.
fn outer_body(s: &str) -> Result<&str, GeometryError> {
    let start = s
        .find('(')
        .ok_or_else(|| GeometryError::InvalidWkt("Missing opening parenthesis".to_string()))?;
    let end = s
        .rfind(')')
        .ok_or_else(|| GeometryError::InvalidWkt("Missing closing parenthesis".to_string()))?;

    if end <= start {
        return Err(GeometryError::InvalidWkt(
            "Invalid parenthesis order".to_string(),
        ));
    }
    if !s[..start].trim().is_empty() || !s[end + 1..].trim().is_empty() {
        return Err(GeometryError::InvalidWkt(
            "Unexpected text outside parentheses".to_string(),
        ));
    }

    Ok(&s[start + 1..end])
}

/// Split `(a),(b)` into `["a", "b"]`, respecting nesting.
fn split_groups(s: &str) -> Result<Vec<&str>, GeometryError> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, ch) in s.char_indices() {
        match ch {
            '(' => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            ')' => {
                if depth == 0 {
                    return Err(GeometryError::InvalidWkt(
                        "Unbalanced parentheses".to_string(),
                    ));
                }
                depth -= 1;
                if depth == 0 {
                    groups.push(&s[start..i]);
                }
            }
            ',' if depth == 0 => {}
            c if depth == 0 && !c.is_whitespace() => {
                return Err(GeometryError::InvalidWkt(format!(
                    "Unexpected character '{}' between groups",
                    c
                )));
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(GeometryError::InvalidWkt(
            "Unbalanced parentheses".to_string(),
        ));
    }

    Ok(groups)
}

fn parse_polygon_body(body: &str, location: &str) -> Result<Polygon, GeometryError> {
    let rings = split_groups(body)?
        .iter()
        .enumerate()
        .map(|(r, ring)| parse_ring(ring, &format!("{} ring {}", location, r)))
        .collect::<Result<Vec<Ring>, _>>()?;

    Polygon::from_rings(rings)
        .ok_or_else(|| GeometryError::InvalidWkt(format!("{} has no rings", location)))
}

fn parse_ring(coords_str: &str, location: &str) -> Result<Ring, GeometryError> {
    let ring = coords_str
        .split(',')
        .map(|pair| {
            let pair = pair.trim();
            let parts: Vec<&str> = pair.split_whitespace().collect();
            if parts.len() != 2 {
                return Err(GeometryError::InvalidWkt(format!(
                    "Expected 'lon lat' format, got '{}'",
                    pair
                )));
            }

            let parse = |s: &str| -> Result<f64, GeometryError> {
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| GeometryError::InvalidCoordinate {
                        location: location.to_string(),
                        detail: format!("'{}' is not a finite number", s),
                    })
            };

            let position: Position = [parse(parts[0])?, parse(parts[1])?];
            Ok(position)
        })
        .collect::<Result<Ring, _>>()?;

    check_ring(&ring, location)?;
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_polygon() {
        let b = Boundary::from_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        assert_eq!(b.polygons.len(), 1);
        assert_eq!(b.polygons[0].exterior.len(), 5);
    }

    #[test]
    fn test_parse_polygon_with_hole() {
        let b = Boundary::from_wkt(
            "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (4 4, 6 4, 6 6, 4 6, 4 4))",
        )
        .unwrap();
        assert_eq!(b.polygons[0].holes.len(), 1);
    }

    #[test]
    fn test_parse_multipolygon() {
        let b = Boundary::from_wkt(
            "MULTIPOLYGON(((0 0, 1 0, 1 1, 0 1, 0 0)),((5 5, 6 5, 6 6, 5 6, 5 5)))",
        )
        .unwrap();
        assert_eq!(b.polygons.len(), 2);
    }

    #[test]
    fn test_rejects_point() {
        assert!(matches!(
            Boundary::from_wkt("POINT(0 0)"),
            Err(GeometryError::InvalidWkt(_))
        ));
    }

    #[test]
    fn test_rejects_open_ring() {
        assert!(matches!(
            Boundary::from_wkt("POLYGON((0 0, 1 0, 1 1, 0 1))"),
            Err(GeometryError::RingNotClosed { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_number() {
        assert!(Boundary::from_wkt("POLYGON((0 0, x 0, 1 1, 0 0))").is_err());
    }
}
