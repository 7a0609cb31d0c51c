//! Carbon stock, sequestration and verification analytics.
//!
//! # Architecture
//!
//! ```text
//! compare_years(session, boundary key, years)
//!      │
//!      ├─► BoundaryResolver: exact id → pattern → "latest"
//!      │
//!      ├─► for each distinct year Y and Y-1 (rayon):
//!      │       GridSource::load ─► parse_grid ─► CarbonDensityTable::reclassify
//!      │            ─► PreparedBoundary::filter ─► CarbonStatistics
//!      │
//!      ├─► per year: growth, leakage, net sequestration, credit band
//!      │
//!      └─► trend + class changes, measurements kept in the session
//!               │
//!               ▼
//!          verify(session, reported series) ─► VerificationReport
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use carbon_engine::{CarbonEngine, DirectoryGridSource, EngineConfig};
//!
//! let source = Arc::new(DirectoryGridSource::new("data/lulc"));
//! let engine = CarbonEngine::new(EngineConfig::from_env(), source)?;
//!
//! engine.register_boundary("session-1", Some("site"), None, &geojson)?;
//! let analysis = engine.compare_years("session-1", "latest", &[2021, 2022])?;
//! println!("net sequestration: {}", analysis.total_net_sequestration);
//! ```

pub mod analyzer;
pub mod artifacts;
pub mod class_change;
pub mod config;
pub mod engine;
pub mod loader;
pub mod matcher;
pub mod progress;
pub mod reclassify;
pub mod resolver;
pub mod stats;
pub mod trend;

// Re-export commonly used types at crate root
pub use analyzer::{
    CarbonStockReport, ComparativeAnalysis, ComparativeAnalyzer, SkipReason, SkippedYear,
    YearMeasurement,
};
pub use artifacts::{
    ArtifactRepository, ArtifactStore, RepositoryStats, SessionArtifacts, StoredBoundary,
    DEFAULT_MAX_SESSIONS,
};
pub use class_change::{detect_class_changes, summarize_class_changes, ClassChange, ClassChangeSummary};
pub use config::EngineConfig;
pub use engine::{BoundarySummary, CarbonEngine};
pub use loader::{
    load_grid, parse_grid, DirectoryGridSource, GridSource, InMemoryGridSource, ParsedGrid,
    DEFAULT_GRID_PATTERN,
};
pub use matcher::{
    discrepancy, match_series, parse_reported_series, ComparisonMetric, Discrepancy,
    DiscrepancyType, MatchedYear, VerificationReport,
};
pub use progress::{
    ChannelProgress, NoopProgress, ProgressEvent, ProgressRun, ProgressSink, ProgressState,
    RecordingProgress, TracingProgress,
};
pub use reclassify::{CarbonDensityTable, ClassInfo};
pub use resolver::{BoundaryResolver, ExactId, Latest, PatternMatch, ResolutionStrategy, LATEST_SENTINEL};
pub use stats::{CarbonStatistics, ClassStats};
pub use trend::{estimate_trend, Trend};

pub use carbon_common::{CarbonError, CarbonResult, EmptyKind};
