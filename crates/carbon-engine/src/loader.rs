//! Year-keyed land-cover grid loading.
//!
//! A [`GridSource`] answers "what is the raw grid for year Y?" with either
//! the content or `None`. It never errors, so multi-year loops can treat a
//! missing year as a skip instead of an abort.
//!
//! Grid rows are `longitude,latitude,class_code`. Comma, semicolon and tab
//! delimiters are accepted. Blank lines, `#` comments and a leading header
//! row are ignored; any other row that fails to parse is skipped and counted.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use carbon_common::{CarbonError, ClassCode, GridPoint};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Placeholder replaced by the year in file name patterns.
pub const YEAR_PLACEHOLDER: &str = "{year}";

/// Default file name pattern for directory sources.
pub const DEFAULT_GRID_PATTERN: &str = "lulc_{year}.csv";

/// Resolves a year to raw grid content.
pub trait GridSource: Send + Sync {
    /// Raw content for `year`, or `None` when the year is unavailable.
    fn load(&self, year: i32) -> Option<String>;

    /// Years this source can serve, ascending. Empty when unknown.
    fn available_years(&self) -> Vec<i32> {
        Vec::new()
    }
}

/// Grid files stored in one directory, named by a `{year}` pattern.
#[derive(Debug, Clone)]
pub struct DirectoryGridSource {
    dir: PathBuf,
    pattern: String,
}

impl DirectoryGridSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_pattern(dir, DEFAULT_GRID_PATTERN)
    }

    pub fn with_pattern(dir: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            pattern: pattern.into(),
        }
    }

    pub fn path_for(&self, year: i32) -> PathBuf {
        self.dir
            .join(self.pattern.replace(YEAR_PLACEHOLDER, &year.to_string()))
    }
}

impl GridSource for DirectoryGridSource {
    fn load(&self, year: i32) -> Option<String> {
        let path = self.path_for(year);
        match fs::read_to_string(&path) {
            Ok(content) => {
                debug!(year, path = %path.display(), bytes = content.len(), "Loaded grid file");
                Some(content)
            }
            Err(e) => {
                warn!(year, path = %path.display(), error = %e, "Grid file unavailable");
                None
            }
        }
    }

    fn available_years(&self) -> Vec<i32> {
        let Some((prefix, suffix)) = self.pattern.split_once(YEAR_PLACEHOLDER) else {
            return Vec::new();
        };
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut years: Vec<i32> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter_map(|name| {
                name.strip_prefix(prefix)?
                    .strip_suffix(suffix)?
                    .parse::<i32>()
                    .ok()
            })
            .collect();
        years.sort_unstable();
        years
    }
}

/// Grids held in memory, keyed by year.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGridSource {
    grids: BTreeMap<i32, String>,
}

impl InMemoryGridSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: i32, content: impl Into<String>) -> Self {
        self.insert(year, content);
        self
    }

    pub fn insert(&mut self, year: i32, content: impl Into<String>) {
        self.grids.insert(year, content.into());
    }
}

impl GridSource for InMemoryGridSource {
    fn load(&self, year: i32) -> Option<String> {
        self.grids.get(&year).cloned()
    }

    fn available_years(&self) -> Vec<i32> {
        self.grids.keys().copied().collect()
    }
}

/// Grid points parsed from one year's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedGrid {
    pub year: i32,
    pub points: Vec<GridPoint>,
    /// Data rows that failed to parse and were skipped.
    pub skipped_rows: usize,
}

/// Load and parse a year, logging absence.
pub fn load_grid(source: &dyn GridSource, year: i32) -> Option<ParsedGrid> {
    let content = source.load(year)?;
    let parsed = parse_grid(year, &content);
    info!(
        year,
        points = parsed.points.len(),
        skipped_rows = parsed.skipped_rows,
        "Parsed land-cover grid"
    );
    Some(parsed)
}

/// Parse grid content, skipping malformed rows.
pub fn parse_grid(year: i32, content: &str) -> ParsedGrid {
    let mut points = Vec::new();
    let mut skipped_rows = 0usize;
    let mut seen_data = false;

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if !seen_data && is_header(trimmed) {
            seen_data = true;
            continue;
        }
        seen_data = true;

        match parse_row(idx + 1, trimmed) {
            Ok(point) => points.push(point),
            Err(e) => {
                skipped_rows += 1;
                debug!(year, error = %e, "Skipping malformed grid row");
            }
        }
    }

    if skipped_rows > 0 {
        warn!(year, skipped_rows, "Grid contained malformed rows");
    }

    ParsedGrid {
        year,
        points,
        skipped_rows,
    }
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == ',' || c == ';' || c == '\t')
        .map(str::trim)
}

/// A header names all three columns; a row with any numeric field is data.
fn is_header(line: &str) -> bool {
    let fields: Vec<&str> = split_fields(line).collect();
    fields.len() == 3
        && fields
            .iter()
            .all(|f| f.parse::<f64>().is_err() && f.chars().any(char::is_alphabetic))
}

/// Parse one `longitude,latitude,class_code` row.
pub fn parse_row(line: usize, row: &str) -> Result<GridPoint, CarbonError> {
    let malformed = |message: String| CarbonError::MalformedRow { line, message };

    let fields: Vec<&str> = split_fields(row).collect();
    if fields.len() != 3 {
        return Err(malformed(format!("expected 3 fields, got {}", fields.len())));
    }

    let longitude = parse_coordinate(fields[0])
        .filter(|v| (-180.0..=180.0).contains(v))
        .ok_or_else(|| malformed(format!("invalid longitude '{}'", fields[0])))?;
    let latitude = parse_coordinate(fields[1])
        .filter(|v| (-90.0..=90.0).contains(v))
        .ok_or_else(|| malformed(format!("invalid latitude '{}'", fields[1])))?;
    let class_code = parse_class_code(fields[2])
        .ok_or_else(|| malformed(format!("invalid class code '{}'", fields[2])))?;

    Ok(GridPoint::new(longitude, latitude, class_code))
}

fn parse_coordinate(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer codes, or floats with no fractional part (`"10.0"`).
fn parse_class_code(s: &str) -> Option<ClassCode> {
    if let Ok(code) = s.parse::<ClassCode>() {
        return Some(code);
    }
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 && v >= 0.0 && v <= ClassCode::MAX as f64 {
        Some(v as ClassCode)
    } else {
        None
    }
}
