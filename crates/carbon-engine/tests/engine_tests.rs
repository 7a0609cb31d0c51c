//! End-to-end tests for the carbon engine over directory-backed grids.

use std::collections::BTreeMap;
use std::sync::Arc;

use carbon_engine::{
    CarbonEngine, CarbonError, ChannelProgress, ComparisonMetric, DirectoryGridSource,
    DiscrepancyType, EmptyKind, EngineConfig, GridSource, InMemoryGridSource, ProgressState,
    RecordingProgress, SkipReason, Trend,
};
use test_utils::{
    assert_approx_eq, lattice_grid_csv, square_polygon, square_with_hole, uniform_grid_csv,
    GridDir,
};

const SESSION: &str = "session-1";

/// 10 x 10 lattice over [0, 1]², cell size 0.1.
fn lattice(class_at: impl Fn(usize, usize) -> u16) -> String {
    lattice_grid_csv(0.0, 0.0, 0.1, 10, 10, class_at)
}

/// 2020 all grassland; each later year turns one more column into forest.
fn reforestation_dir() -> GridDir {
    GridDir::with_years(&[
        (2020, uniform_grid_csv(0.0, 0.0, 0.1, 10, 10, 30)),
        (2021, lattice(|col, _| if col < 1 { 10 } else { 30 })),
        (2022, lattice(|col, _| if col < 2 { 10 } else { 30 })),
        (2023, lattice(|col, _| if col < 3 { 10 } else { 30 })),
    ])
    .unwrap()
}

fn engine_for(dir: &GridDir) -> CarbonEngine {
    let source = Arc::new(DirectoryGridSource::new(dir.path()));
    CarbonEngine::new(EngineConfig::default(), source).unwrap()
}

fn register_half_square(engine: &CarbonEngine) {
    // Covers lattice columns and rows 0..5
    engine
        .register_boundary(SESSION, Some("plot"), Some("North plot"), &square_polygon(0.0, 0.0, 0.5))
        .unwrap();
}

// ============================================================================
// Carbon stock
// ============================================================================

#[test]
fn test_stock_counts_only_points_inside() {
    let dir = reforestation_dir();
    let engine = engine_for(&dir);
    register_half_square(&engine);

    let report = engine.carbon_stock(SESSION, "plot", 2022).unwrap();
    assert_eq!(report.stats.point_count, 25);
    assert_eq!(report.stats.per_class[&10].count, 10);
    assert_eq!(report.stats.per_class[&30].count, 15);
    assert_approx_eq!(report.stats.total_carbon, 10.0 * 120.0 + 15.0 * 25.0, 1e-9);
    assert_approx_eq!(report.forest_carbon, 1200.0, 1e-9);

    let bounds = report.stats.point_bounds.unwrap();
    assert!(report.bounds.contains_point(bounds.min_x, bounds.min_y));
    assert!(report.bounds.contains_point(bounds.max_x, bounds.max_y));
}

#[test]
fn test_stock_excludes_hole() {
    let dir = reforestation_dir();
    let engine = engine_for(&dir);
    // Hole spans [0.25, 0.75]²
    engine
        .register_boundary(SESSION, Some("donut"), None, &square_with_hole(0.0, 0.0, 1.0))
        .unwrap();

    let report = engine.carbon_stock(SESSION, "donut", 2020).unwrap();
    // Cell centers 0.35..0.65 (4 x 4) lie strictly inside the hole
    assert_eq!(report.stats.point_count, 100 - 16);
}

#[test]
fn test_stock_missing_year_and_empty_boundary() {
    let dir = reforestation_dir();
    let engine = engine_for(&dir);
    register_half_square(&engine);
    engine
        .register_boundary(SESSION, Some("far"), None, &square_polygon(50.0, 50.0, 1.0))
        .unwrap();

    let err = engine.carbon_stock(SESSION, "plot", 1999).unwrap_err();
    assert!(matches!(err, CarbonError::MissingResource(_)));

    let err = engine.carbon_stock(SESSION, "far", 2020).unwrap_err();
    assert!(err.to_string().contains("no points inside boundary"));
}

// ============================================================================
// Multi-year comparison
// ============================================================================

#[test]
fn test_compare_years_figures() {
    let dir = reforestation_dir();
    let engine = engine_for(&dir);
    register_half_square(&engine);

    let analysis = engine
        .compare_years(SESSION, "latest", &[2023, 2021, 2022])
        .unwrap();

    assert_eq!(analysis.measurements.len(), 3);
    assert!(analysis.skipped.is_empty());
    // Each year converts 5 grassland points to forest: 5 * (120 - 25)
    for m in &analysis.measurements {
        assert_eq!(m.baseline_year, m.year - 1);
        assert_approx_eq!(m.forest_growth, 475.0, 1e-9);
        assert_approx_eq!(m.leakage, 47.5, 1e-9);
        assert_approx_eq!(m.net_sequestration, m.forest_growth - m.leakage, 1e-12);
        assert_approx_eq!(m.min_credits, 427.5 * 5.0, 1e-9);
        assert_approx_eq!(m.max_credits, 427.5 * 15.0, 1e-9);
    }
    assert_approx_eq!(analysis.measurements[2].cumulative_growth, 1425.0, 1e-9);
    assert_approx_eq!(analysis.total_net_sequestration, 3.0 * 427.5, 1e-9);
    assert_eq!(analysis.carbon_trend, Trend::Increasing);
    assert_approx_eq!(analysis.boundary_area_ha, analysis.measurements[0].boundary_area_ha, 0.0);

    let change_2021 = &analysis.class_changes[&2021];
    assert!(change_2021.forest_gain);
    assert_eq!(change_2021.forest_count_change, 5);
}

#[test]
fn test_empty_baseline_fails_with_no_analyzable_data() {
    // 2020 exists but has no point inside the boundary
    let dir = GridDir::with_years(&[
        (2020, uniform_grid_csv(40.0, 40.0, 0.1, 5, 5, 10)),
        (2021, uniform_grid_csv(0.0, 0.0, 0.1, 5, 5, 10)),
    ])
    .unwrap();
    let engine = engine_for(&dir);
    register_half_square(&engine);

    let err = engine.compare_years(SESSION, "plot", &[2021]).unwrap_err();
    assert!(matches!(
        err,
        CarbonError::EmptyResult {
            kind: EmptyKind::NoAnalyzableData,
            ..
        }
    ));
    assert!(err.to_string().contains("no analyzable data"));
}

#[test]
fn test_partial_years_are_skipped() {
    let dir = reforestation_dir();
    let engine = engine_for(&dir);
    register_half_square(&engine);

    let analysis = engine
        .compare_years(SESSION, "plot", &[2020, 2022, 2025])
        .unwrap();

    let years: Vec<i32> = analysis.measurements.iter().map(|m| m.year).collect();
    assert_eq!(years, vec![2022]);
    let reasons: Vec<SkipReason> = analysis.skipped.iter().map(|s| s.reason).collect();
    assert_eq!(
        reasons,
        vec![
            SkipReason::MissingGrid { year: 2019 },
            SkipReason::MissingGrid { year: 2024 },
        ]
    );
    assert_eq!(analysis.carbon_trend, Trend::InsufficientData);
}

#[test]
fn test_negative_growth_has_zero_leakage() {
    let dir = GridDir::with_years(&[
        (2020, uniform_grid_csv(0.0, 0.0, 0.1, 10, 10, 10)),
        (2021, uniform_grid_csv(0.0, 0.0, 0.1, 10, 10, 40)),
    ])
    .unwrap();
    let engine = engine_for(&dir);
    register_half_square(&engine);

    let m = &engine.compare_years(SESSION, "plot", &[2021]).unwrap().measurements[0];
    assert!(m.forest_growth < 0.0);
    assert_eq!(m.leakage, 0.0);
    assert_eq!(m.min_credits, 0.0);
    assert_eq!(m.max_credits, 0.0);
}

#[test]
fn test_parallel_filter_matches_serial() {
    let dir = reforestation_dir();
    let serial = engine_for(&dir);
    let parallel = CarbonEngine::new(
        EngineConfig {
            parallel_filter_threshold: 1,
            ..EngineConfig::default()
        },
        Arc::new(DirectoryGridSource::new(dir.path())),
    )
    .unwrap();
    register_half_square(&serial);
    register_half_square(&parallel);

    let a = serial.compare_years(SESSION, "plot", &[2021, 2022]).unwrap();
    let b = parallel.compare_years(SESSION, "plot", &[2021, 2022]).unwrap();
    assert_eq!(a.measurements, b.measurements);
}

// ============================================================================
// Verification
// ============================================================================

#[test]
fn test_verify_against_session_measurements() {
    let dir = reforestation_dir();
    let engine = engine_for(&dir);
    register_half_square(&engine);
    engine
        .compare_years(SESSION, "plot", &[2021, 2022])
        .unwrap();

    // 2021 exact, 2022 reported lower than computed, 2030 unmatched
    let reported = BTreeMap::from([(2021, 427.5), (2022, 300.0), (2030, 1.0)]);
    let report = engine
        .verify(SESSION, &reported, ComparisonMetric::NetSequestration)
        .unwrap();

    assert_eq!(report.matched.len(), 2);
    assert_eq!(report.matched[0].discrepancy.kind, DiscrepancyType::Match);
    assert_eq!(report.matched[1].discrepancy.kind, DiscrepancyType::Overestimate);
    assert_approx_eq!(report.matched[1].discrepancy.absolute, 300.0 - 427.5, 1e-9);
    assert_approx_eq!(report.matched[1].discrepancy.percentage, -42.5, 1e-9);
    assert_eq!(report.unmatched_reported_years, vec![2030]);
    assert_eq!(report.overestimate_count, 1);
    assert!(!report.all_match());
}

#[test]
fn test_verify_without_overlap() {
    let dir = reforestation_dir();
    let engine = engine_for(&dir);
    register_half_square(&engine);
    engine.compare_years(SESSION, "plot", &[2021]).unwrap();

    let err = engine
        .verify(SESSION, &BTreeMap::from([(1990, 1.0)]), ComparisonMetric::TotalCarbon)
        .unwrap_err();
    assert!(err.to_string().contains("no overlapping years"));
}

// ============================================================================
// Overlap
// ============================================================================

#[test]
fn test_overlap_with_reference_layer() {
    let dir = reforestation_dir();
    let engine = engine_for(&dir);
    register_half_square(&engine);

    let reference = square_polygon(0.25, 0.0, 0.5);
    let result = engine.overlap(SESSION, "plot", Some(&reference)).unwrap();
    assert!(result.has_overlap);
    assert_approx_eq!(result.overlap_percentage, 50.0, 1.0);

    let none = engine.overlap(SESSION, "plot", None).unwrap();
    assert!(!none.has_overlap);
    assert_eq!(none.overlap_area_ha, 0.0);
}

// ============================================================================
// Progress reporting
// ============================================================================

#[test]
fn test_each_run_has_one_terminal_event() {
    let sink = Arc::new(RecordingProgress::new());
    let source = InMemoryGridSource::new().with_year(2021, "0.1,0.1,10\n");
    let engine = CarbonEngine::new(EngineConfig::default(), Arc::new(source))
        .unwrap()
        .with_progress(sink.clone());
    register_half_square(&engine);

    let _ = engine.carbon_stock(SESSION, "plot", 2021);
    let _ = engine.compare_years(SESSION, "plot", &[2021]);

    let events = sink.events();
    let mut by_run: BTreeMap<String, Vec<ProgressState>> = BTreeMap::new();
    for e in &events {
        by_run.entry(e.run_id.to_string()).or_default().push(e.state);
    }
    assert_eq!(by_run.len(), 3);
    for states in by_run.values() {
        assert_eq!(states.len(), 2);
        assert_eq!(states[0], ProgressState::Started);
        assert_ne!(states[1], ProgressState::Started);
    }

    let failed: Vec<_> = events
        .iter()
        .filter(|e| e.state == ProgressState::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].operation, "compare_years");
}

#[test]
fn test_channel_progress_delivers_events() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let dir = reforestation_dir();
    let engine = engine_for(&dir).with_progress(Arc::new(ChannelProgress::new(tx)));
    register_half_square(&engine);

    let started = tokio_test::block_on(rx.recv()).unwrap();
    let completed = tokio_test::block_on(rx.recv()).unwrap();
    assert_eq!(started.operation, "register_boundary");
    assert_eq!(started.run_id, completed.run_id);
    assert_eq!(completed.state, ProgressState::Completed);
}

// ============================================================================
// Grid sources
// ============================================================================

#[test]
fn test_directory_source_lists_years() {
    let dir = reforestation_dir();
    let source = DirectoryGridSource::new(dir.path());
    assert_eq!(source.available_years(), vec![2020, 2021, 2022, 2023]);
    assert!(source.load(2019).is_none());
}
