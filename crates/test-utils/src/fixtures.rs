//! Common test fixtures for boundary and grid tests.

use serde_json::{json, Value};

/// Closed square ring with its south-west corner at `(lng, lat)`, counter-clockwise.
pub fn square_ring(lng: f64, lat: f64, size: f64) -> Vec<[f64; 2]> {
    vec![
        [lng, lat],
        [lng + size, lat],
        [lng + size, lat + size],
        [lng, lat + size],
        [lng, lat],
    ]
}

/// GeoJSON Polygon for a square.
pub fn square_polygon(lng: f64, lat: f64, size: f64) -> Value {
    json!({ "type": "Polygon", "coordinates": [square_ring(lng, lat, size)] })
}

/// Square with a centered square hole of half its size.
pub fn square_with_hole(lng: f64, lat: f64, size: f64) -> Value {
    let q = size / 4.0;
    let mut hole = square_ring(lng + q, lat + q, size / 2.0);
    hole.reverse();
    json!({ "type": "Polygon", "coordinates": [square_ring(lng, lat, size), hole] })
}

/// Two disjoint squares as a MultiPolygon.
pub fn two_square_multipolygon(size: f64) -> Value {
    json!({
        "type": "MultiPolygon",
        "coordinates": [
            [square_ring(0.0, 0.0, size)],
            [square_ring(3.0 * size, 3.0 * size, size)],
        ]
    })
}

/// Payloads that must fail validation.
pub mod invalid {
    use serde_json::{json, Value};

    pub fn point() -> Value {
        json!({ "type": "Point", "coordinates": [0.0, 0.0] })
    }

    pub fn open_ring() -> Value {
        json!({ "type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]] })
    }

    pub fn short_ring() -> Value {
        json!({ "type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]] })
    }

    pub fn string_coordinate() -> Value {
        json!({ "type": "Polygon", "coordinates": [[[0.0, 0.0], ["1", 0.0], [1.0, 1.0], [0.0, 0.0]]] })
    }
}
