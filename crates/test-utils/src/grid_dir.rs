//! Temporary directories populated with per-year grid files.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Default file naming used by directory-backed grid sources.
pub const DEFAULT_GRID_PATTERN: &str = "lulc_{year}.csv";

/// A temporary directory holding `lulc_{year}.csv` files.
///
/// The directory is removed when this value is dropped.
pub struct GridDir {
    dir: TempDir,
}

impl GridDir {
    /// Create a directory with one file per `(year, content)` pair.
    pub fn with_years(years: &[(i32, String)]) -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        for (year, content) in years {
            let name = DEFAULT_GRID_PATTERN.replace("{year}", &year.to_string());
            fs::write(dir.path().join(name), content)?;
        }
        Ok(Self { dir })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }
}
