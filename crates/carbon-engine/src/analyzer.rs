//! Multi-year comparative analysis.
//!
//! Each requested year `Y` is compared against `Y - 1`. Every distinct year
//! the request needs is loaded, reclassified, filtered and aggregated exactly
//! once, in parallel, and the results are keyed by year so the outcome does
//! not depend on completion order.

use std::collections::{BTreeMap, BTreeSet};

use carbon_common::{BoundingBox, CarbonError, CarbonPoint, CarbonResult, EmptyKind};
use carbon_geometry::{Boundary, FilteredDataset, PreparedBoundary};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::class_change::{summarize_class_changes, ClassChangeSummary};
use crate::config::EngineConfig;
use crate::loader::{load_grid, GridSource};
use crate::reclassify::CarbonDensityTable;
use crate::stats::CarbonStatistics;
use crate::trend::{estimate_trend, Trend};

/// Sequestration figures for one year against its baseline year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearMeasurement {
    pub year: i32,
    /// Always `year - 1`.
    pub baseline_year: i32,
    pub stats: CarbonStatistics,
    pub baseline_stats: CarbonStatistics,
    pub boundary_area_ha: f64,
    pub forest_growth: f64,
    pub leakage: f64,
    pub net_sequestration: f64,
    pub min_credits: f64,
    pub max_credits: f64,
    pub cumulative_growth: f64,
    pub annual_growth_rate: f64,
}

/// Why a requested year produced no measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The grid for this year (the analysis year or its baseline) is absent.
    MissingGrid { year: i32 },
    /// The grid for this year has no point inside the boundary.
    EmptyInBoundary { year: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedYear {
    pub year: i32,
    pub reason: SkipReason,
}

/// Result of a multi-year comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparativeAnalysis {
    pub boundary_area_ha: f64,
    pub bounds: BoundingBox,
    /// Ascending by year.
    pub measurements: Vec<YearMeasurement>,
    pub skipped: Vec<SkippedYear>,
    pub carbon_trend: Trend,
    pub class_changes: BTreeMap<i32, ClassChangeSummary>,
    pub total_forest_growth: f64,
    pub total_net_sequestration: f64,
    pub total_min_credits: f64,
    pub total_max_credits: f64,
}

/// Carbon stock inside a boundary for a single year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonStockReport {
    pub year: i32,
    pub boundary_area_ha: f64,
    pub bounds: BoundingBox,
    pub stats: CarbonStatistics,
    pub forest_carbon: f64,
    pub mean_density: f64,
    /// Grid rows skipped while parsing.
    pub skipped_rows: usize,
}

/// Outcome of preparing one year.
#[derive(Debug, Clone)]
enum YearData {
    Missing,
    Loaded {
        stats: CarbonStatistics,
        skipped_rows: usize,
    },
}

/// Drives loader, reclassifier, filter and aggregator per year.
pub struct ComparativeAnalyzer<'a> {
    source: &'a dyn GridSource,
    table: &'a CarbonDensityTable,
    config: &'a EngineConfig,
}

impl<'a> ComparativeAnalyzer<'a> {
    pub fn new(
        source: &'a dyn GridSource,
        table: &'a CarbonDensityTable,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            source,
            table,
            config,
        }
    }

    fn prepare_year(&self, year: i32, prepared: &PreparedBoundary) -> YearData {
        let Some(grid) = load_grid(self.source, year) else {
            return YearData::Missing;
        };
        // Filter and reclassify in one pass; only kept points are collected
        let threshold = self.config.parallel_filter_threshold;
        let points: Vec<CarbonPoint> = if grid.points.len() > threshold {
            grid.points
                .par_iter()
                .filter(|p| prepared.contains(p.longitude, p.latitude))
                .map(|p| p.with_density(self.table.density(p.class_code)))
                .collect()
        } else {
            prepared
                .filter_iter(self.table.reclassify(grid.points.iter().copied()))
                .collect()
        };
        debug!(year, input = grid.points.len(), kept = points.len(), "Filtered grid");
        let dataset = FilteredDataset::new(year, points);
        YearData::Loaded {
            stats: CarbonStatistics::from_dataset(&dataset),
            skipped_rows: grid.skipped_rows,
        }
    }

    /// Carbon stock for one year.
    #[instrument(skip(self, boundary))]
    pub fn stock_for_year(&self, year: i32, boundary: &Boundary) -> CarbonResult<CarbonStockReport> {
        let prepared = PreparedBoundary::new(boundary);
        match self.prepare_year(year, &prepared) {
            YearData::Missing => Err(CarbonError::missing(format!("grid for year {}", year))),
            YearData::Loaded { stats, .. } if stats.is_empty() => Err(CarbonError::empty(
                EmptyKind::NoPointsInBoundary,
                format!("year {}", year),
            )),
            YearData::Loaded {
                stats,
                skipped_rows,
            } => {
                info!(
                    year,
                    points = stats.point_count,
                    total_carbon = stats.total_carbon,
                    "Computed carbon stock"
                );
                Ok(CarbonStockReport {
                    year,
                    boundary_area_ha: boundary.area_ha(),
                    bounds: boundary.bounds(),
                    forest_carbon: stats.forest_carbon(self.table),
                    mean_density: stats.mean_density(),
                    stats,
                    skipped_rows,
                })
            }
        }
    }

    /// Compare each requested year against the year before it.
    #[instrument(skip(self, boundary), fields(requested = years.len()))]
    pub fn analyze(&self, years: &[i32], boundary: &Boundary) -> CarbonResult<ComparativeAnalysis> {
        let requested: BTreeSet<i32> = years.iter().copied().collect();
        if requested.is_empty() {
            return Err(CarbonError::InvalidInput("no years requested".to_string()));
        }

        let pairs = requested
            .iter()
            .map(|&year| {
                year.checked_sub(1)
                    .map(|baseline| (baseline, year))
                    .ok_or_else(|| {
                        CarbonError::InvalidInput(format!("year {} has no preceding year", year))
                    })
            })
            .collect::<CarbonResult<Vec<(i32, i32)>>>()?;

        let needed: BTreeSet<i32> = pairs.iter().flat_map(|&(b, y)| [b, y]).collect();
        let prepared = PreparedBoundary::new(boundary);

        let loaded: BTreeMap<i32, YearData> = needed
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|year| (year, self.prepare_year(year, &prepared)))
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        let boundary_area_ha = boundary.area_ha();
        let mut measurements = Vec::new();
        let mut skipped = Vec::new();
        let mut class_changes = BTreeMap::new();
        let mut cumulative_growth = 0.0;

        for (baseline_year, year) in pairs {
            let pair = (
                stats_for(&loaded, baseline_year),
                stats_for(&loaded, year),
            );

            let (baseline, current) = match pair {
                (Err(reason), _) | (_, Err(reason)) => {
                    warn!(year, ?reason, "Skipping year");
                    skipped.push(SkippedYear { year, reason });
                    continue;
                }
                (Ok(b), Ok(c)) => (b, c),
            };

            let forest_growth = current.total_carbon - baseline.total_carbon;
            let leakage = self.config.leakage(forest_growth);
            let net_sequestration = forest_growth - leakage;
            let (min_credits, max_credits) = self.config.credit_band(net_sequestration);
            let annual_growth_rate = if baseline.total_carbon != 0.0 {
                forest_growth / baseline.total_carbon * 100.0
            } else {
                0.0
            };
            cumulative_growth += forest_growth;

            class_changes.insert(year, summarize_class_changes(baseline, current, self.table));
            measurements.push(YearMeasurement {
                year,
                baseline_year,
                stats: current.clone(),
                baseline_stats: baseline.clone(),
                boundary_area_ha,
                forest_growth,
                leakage,
                net_sequestration,
                min_credits,
                max_credits,
                cumulative_growth,
                annual_growth_rate,
            });
        }

        if measurements.is_empty() {
            return Err(CarbonError::empty(
                EmptyKind::NoAnalyzableData,
                format!("{} requested year(s) skipped", skipped.len()),
            ));
        }

        let series: Vec<(i32, f64)> = measurements
            .iter()
            .map(|m| (m.year, m.stats.total_carbon))
            .collect();
        let carbon_trend = estimate_trend(&series, self.config.trend_stable_threshold);

        let sum = |f: fn(&YearMeasurement) -> f64| measurements.iter().map(f).sum::<f64>();
        let analysis = ComparativeAnalysis {
            boundary_area_ha,
            bounds: boundary.bounds(),
            carbon_trend,
            class_changes,
            total_forest_growth: sum(|m| m.forest_growth),
            total_net_sequestration: sum(|m| m.net_sequestration),
            total_min_credits: sum(|m| m.min_credits),
            total_max_credits: sum(|m| m.max_credits),
            measurements,
            skipped,
        };

        info!(
            analyzed = analysis.measurements.len(),
            skipped = analysis.skipped.len(),
            trend = %analysis.carbon_trend,
            "Comparative analysis complete"
        );
        Ok(analysis)
    }
}

fn stats_for(
    loaded: &BTreeMap<i32, YearData>,
    year: i32,
) -> Result<&CarbonStatistics, SkipReason> {
    match loaded.get(&year) {
        Some(YearData::Loaded { stats, .. }) if !stats.is_empty() => Ok(stats),
        Some(YearData::Loaded { .. }) => Err(SkipReason::EmptyInBoundary { year }),
        Some(YearData::Missing) | None => Err(SkipReason::MissingGrid { year }),
    }
}
