//! Reconciliation of computed measurements against reported figures.

use std::collections::{BTreeMap, BTreeSet};

use carbon_common::{CarbonError, CarbonResult, EmptyKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::analyzer::YearMeasurement;

/// Floor applied to |reported| before dividing.
pub const PERCENTAGE_EPSILON: f64 = 1e-9;

/// Which computed figure a reported series is compared against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMetric {
    TotalCarbon,
    ForestGrowth,
    #[default]
    NetSequestration,
}

impl ComparisonMetric {
    pub fn value_of(&self, m: &YearMeasurement) -> f64 {
        match self {
            ComparisonMetric::TotalCarbon => m.stats.total_carbon,
            ComparisonMetric::ForestGrowth => m.forest_growth,
            ComparisonMetric::NetSequestration => m.net_sequestration,
        }
    }
}

impl std::str::FromStr for ComparisonMetric {
    type Err = CarbonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "total_carbon" => Ok(Self::TotalCarbon),
            "forest_growth" => Ok(Self::ForestGrowth),
            "net_sequestration" => Ok(Self::NetSequestration),
            other => Err(CarbonError::InvalidInput(format!(
                "unknown comparison metric '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyType {
    Overestimate,
    Underestimate,
    Match,
}

/// Signed and relative difference between a reported and a computed figure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    /// `reported - computed`.
    pub absolute: f64,
    /// `absolute / max(|reported|, eps) * 100`.
    pub percentage: f64,
    #[serde(rename = "type")]
    pub kind: DiscrepancyType,
}

/// Score one reported/computed pair.
pub fn discrepancy(reported: f64, computed: f64, tolerance_percent: f64) -> Discrepancy {
    let absolute = reported - computed;
    let percentage = absolute / reported.abs().max(PERCENTAGE_EPSILON) * 100.0;

    let kind = if percentage.abs() <= tolerance_percent {
        DiscrepancyType::Match
    } else if computed > reported {
        DiscrepancyType::Overestimate
    } else {
        DiscrepancyType::Underestimate
    };

    Discrepancy {
        absolute,
        percentage,
        kind,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchedYear {
    pub year: i32,
    pub reported: f64,
    pub computed: f64,
    pub discrepancy: Discrepancy,
}

/// Matched years plus summary figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub metric: ComparisonMetric,
    pub tolerance_percent: f64,
    pub matched: Vec<MatchedYear>,
    pub unmatched_reported_years: Vec<i32>,
    pub unmatched_computed_years: Vec<i32>,
    pub mean_abs_percentage: f64,
    pub max_abs_percentage: f64,
    pub match_count: usize,
    pub overestimate_count: usize,
    pub underestimate_count: usize,
}

impl VerificationReport {
    /// True when every matched year lies within tolerance.
    pub fn all_match(&self) -> bool {
        self.match_count == self.matched.len()
    }
}

/// Pair measurements with reported values by exact year.
pub fn match_series(
    measurements: &[YearMeasurement],
    reported: &BTreeMap<i32, f64>,
    metric: ComparisonMetric,
    tolerance_percent: f64,
) -> CarbonResult<VerificationReport> {
    let computed: BTreeMap<i32, f64> = measurements
        .iter()
        .map(|m| (m.year, metric.value_of(m)))
        .collect();

    let matched: Vec<MatchedYear> = computed
        .iter()
        .filter_map(|(&year, &computed)| {
            let reported = *reported.get(&year)?;
            Some(MatchedYear {
                year,
                reported,
                computed,
                discrepancy: discrepancy(reported, computed, tolerance_percent),
            })
        })
        .collect();

    let matched_years: BTreeSet<i32> = matched.iter().map(|m| m.year).collect();
    let unmatched_reported_years = years_missing_from(reported, &matched_years);
    let unmatched_computed_years = years_missing_from(&computed, &matched_years);

    if matched.is_empty() {
        return Err(CarbonError::empty(
            EmptyKind::NoOverlappingYears,
            format!(
                "computed years {:?}, reported years {:?}",
                unmatched_computed_years, unmatched_reported_years
            ),
        ));
    }

    let abs: Vec<f64> = matched.iter().map(|m| m.discrepancy.percentage.abs()).collect();
    let count = |kind: DiscrepancyType| matched.iter().filter(|m| m.discrepancy.kind == kind).count();

    let report = VerificationReport {
        metric,
        tolerance_percent,
        mean_abs_percentage: abs.iter().sum::<f64>() / abs.len() as f64,
        max_abs_percentage: abs.iter().copied().fold(0.0, f64::max),
        match_count: count(DiscrepancyType::Match),
        overestimate_count: count(DiscrepancyType::Overestimate),
        underestimate_count: count(DiscrepancyType::Underestimate),
        matched,
        unmatched_reported_years,
        unmatched_computed_years,
    };

    debug!(unmatched = ?report.unmatched_reported_years, "Reported years without measurements");
    info!(
        matched = report.matched.len(),
        mismatches = report.overestimate_count + report.underestimate_count,
        max_abs_percentage = report.max_abs_percentage,
        "Verification complete"
    );
    Ok(report)
}

fn years_missing_from(series: &BTreeMap<i32, f64>, matched: &BTreeSet<i32>) -> Vec<i32> {
    series
        .keys()
        .filter(|year| !matched.contains(*year))
        .copied()
        .collect()
}

/// Parse a reported series from `{"2021": 1.0}` or `[{"year": 2021, "value": 1.0}]`.
pub fn parse_reported_series(value: &Value) -> CarbonResult<BTreeMap<i32, f64>> {
    let invalid = |msg: String| CarbonError::InvalidInput(msg);

    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| -> CarbonResult<(i32, f64)> {
                let year = k
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| invalid(format!("reported year '{}' is not an integer", k)))?;
                let value = finite(v).ok_or_else(|| {
                    invalid(format!("reported value for {} is not a number", year))
                })?;
                Ok((year, value))
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| -> CarbonResult<(i32, f64)> {
                let year = item
                    .get("year")
                    .and_then(|y| {
                        y.as_i64()
                            .or_else(|| y.as_str().and_then(|s| s.trim().parse().ok()))
                    })
                    .and_then(|y| i32::try_from(y).ok())
                    .ok_or_else(|| invalid(format!("entry {} has no integer 'year'", i)))?;
                let value = item
                    .get("value")
                    .and_then(finite)
                    .ok_or_else(|| invalid(format!("entry {} has no numeric 'value'", i)))?;
                Ok((year, value))
            })
            .collect(),
        _ => Err(invalid(
            "reported series must be an object or an array".to_string(),
        )),
    }
}

fn finite(v: &Value) -> Option<f64> {
    v.as_f64().filter(|f| f.is_finite())
}
