//! Per-class transitions between a baseline year and an analysis year.

use std::collections::BTreeSet;

use carbon_common::ClassCode;
use serde::{Deserialize, Serialize};

use crate::reclassify::CarbonDensityTable;
use crate::stats::{CarbonStatistics, ClassStats};

/// Change in one class between two periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassChange {
    pub class_code: ClassCode,
    pub label: String,
    pub baseline_count: usize,
    pub current_count: usize,
    pub count_change: i64,
    pub baseline_carbon: f64,
    pub current_carbon: f64,
    pub carbon_change: f64,
}

/// Class changes plus the net movement of forest classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassChangeSummary {
    pub changes: Vec<ClassChange>,
    pub forest_count_change: i64,
    pub forest_carbon_change: f64,
    pub forest_loss: bool,
    pub forest_gain: bool,
}

/// Compare every class present in either period, ordered by class code.
pub fn detect_class_changes(
    baseline: &CarbonStatistics,
    current: &CarbonStatistics,
    table: &CarbonDensityTable,
) -> Vec<ClassChange> {
    let codes: BTreeSet<ClassCode> = baseline
        .per_class
        .keys()
        .chain(current.per_class.keys())
        .copied()
        .collect();

    codes
        .into_iter()
        .map(|code| {
            let before = baseline.per_class.get(&code).copied().unwrap_or_default();
            let after = current.per_class.get(&code).copied().unwrap_or_default();
            change_for(code, before, after, table)
        })
        .collect()
}

fn change_for(
    class_code: ClassCode,
    before: ClassStats,
    after: ClassStats,
    table: &CarbonDensityTable,
) -> ClassChange {
    ClassChange {
        class_code,
        label: table.label(class_code).to_string(),
        baseline_count: before.count,
        current_count: after.count,
        count_change: after.count as i64 - before.count as i64,
        baseline_carbon: before.sum_carbon,
        current_carbon: after.sum_carbon,
        carbon_change: after.sum_carbon - before.sum_carbon,
    }
}

/// Detect changes and summarize forest movement.
pub fn summarize_class_changes(
    baseline: &CarbonStatistics,
    current: &CarbonStatistics,
    table: &CarbonDensityTable,
) -> ClassChangeSummary {
    let changes = detect_class_changes(baseline, current, table);

    let (forest_count_change, forest_carbon_change) = changes
        .iter()
        .filter(|c| table.is_forest(c.class_code))
        .fold((0i64, 0.0f64), |(n, c), ch| (n + ch.count_change, c + ch.carbon_change));

    ClassChangeSummary {
        changes,
        forest_count_change,
        forest_carbon_change,
        forest_loss: forest_count_change < 0,
        forest_gain: forest_count_change > 0,
    }
}
