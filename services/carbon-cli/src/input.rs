//! Reading boundaries and reported series from local files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use carbon_engine::parse_reported_series;
use carbon_geometry::Boundary;
use serde_json::Value;

/// Load a boundary file as a GeoJSON value.
///
/// `.wkt` files, or files whose content starts with `POLYGON`/`MULTIPOLYGON`,
/// are parsed as WKT and converted. Anything else is read as JSON.
pub fn load_boundary_payload(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read boundary file {}", path.display()))?;

    if is_wkt(path, &content) {
        let boundary = Boundary::from_wkt(&content)
            .with_context(|| format!("Invalid WKT in {}", path.display()))?;
        return Ok(boundary.to_geojson());
    }

    serde_json::from_str(&content)
        .with_context(|| format!("Boundary file {} is not valid JSON", path.display()))
}

fn is_wkt(path: &Path, content: &str) -> bool {
    let by_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wkt"));
    let head = content.trim_start().to_ascii_uppercase();
    by_extension || head.starts_with("POLYGON") || head.starts_with("MULTIPOLYGON")
}

/// Boundary id derived from the file name.
pub fn boundary_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("boundary")
        .to_string()
}

/// Load a reported year → value series from a JSON file.
pub fn load_reported_series(path: &Path) -> Result<BTreeMap<i32, f64>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read reported series {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Reported series {} is not valid JSON", path.display()))?;
    Ok(parse_reported_series(&value)?)
}
