//! Directional trend of a yearly series.

use serde::{Deserialize, Serialize};

/// Minimum number of points needed to call a trend.
pub const MIN_TREND_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
            Trend::InsufficientData => "insufficient_data",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a `(year, value)` series by its least-squares slope.
///
/// The slope is taken relative to the mean magnitude of the series, so
/// `stable_threshold = 0.01` means "less than 1% of the mean per year".
pub fn estimate_trend(points: &[(i32, f64)], stable_threshold: f64) -> Trend {
    if points.len() < MIN_TREND_POINTS {
        return Trend::InsufficientData;
    }

    let mut sorted = points.to_vec();
    sorted.sort_by_key(|(year, _)| *year);

    let Some(slope) = linear_slope(&sorted) else {
        return Trend::InsufficientData;
    };

    let mean = sorted.iter().map(|(_, v)| v).sum::<f64>() / sorted.len() as f64;
    let relative = slope / mean.abs().max(f64::EPSILON);

    if relative.abs() <= stable_threshold {
        Trend::Stable
    } else if relative > 0.0 {
        Trend::Increasing
    } else {
        Trend::Decreasing
    }
}

/// Least-squares slope in value units per year. `None` when all years coincide.
pub fn linear_slope(points: &[(i32, f64)]) -> Option<f64> {
    let n = points.len() as f64;
    if points.is_empty() {
        return None;
    }
    let mean_x = points.iter().map(|(x, _)| *x as f64).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut num, mut den) = (0.0, 0.0);
    for (x, y) in points {
        let dx = *x as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }

    if den == 0.0 {
        None
    } else {
        Some(num / den)
    }
}
