//! Request-level operations.
//!
//! `CarbonEngine` owns the immutable configuration and density table, the
//! grid source, the session artifact repository and the progress sink. Each
//! public operation is one progress run: `started`, then `completed` or
//! `failed` with the error message, then the result is returned.

use std::collections::BTreeMap;
use std::sync::Arc;

use carbon_common::{BoundingBox, CarbonError, CarbonResult};
use carbon_geometry::{
    compute_overlap, overlap_with_reference, parse_boundary, validate_geometry, GeometryValidation,
    OverlapResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::analyzer::{CarbonStockReport, ComparativeAnalysis, ComparativeAnalyzer, YearMeasurement};
use crate::artifacts::{ArtifactRepository, StoredBoundary};
use crate::config::EngineConfig;
use crate::loader::GridSource;
use crate::matcher::{match_series, ComparisonMetric, VerificationReport};
use crate::progress::{ProgressRun, ProgressSink, TracingProgress};
use crate::reclassify::CarbonDensityTable;
use crate::resolver::BoundaryResolver;

/// Area and extent of a boundary payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundarySummary {
    pub geometry_type: Option<String>,
    pub polygon_count: usize,
    pub area_ha: f64,
    pub bounds: BoundingBox,
}

pub struct CarbonEngine {
    config: EngineConfig,
    table: CarbonDensityTable,
    source: Arc<dyn GridSource>,
    repository: Arc<ArtifactRepository>,
    resolver: BoundaryResolver,
    progress: Arc<dyn ProgressSink>,
}

impl CarbonEngine {
    /// Build an engine with a fresh repository sized by `max_sessions` and
    /// tracing progress.
    pub fn new(config: EngineConfig, source: Arc<dyn GridSource>) -> CarbonResult<Self> {
        config.validate().map_err(CarbonError::InvalidConfig)?;
        let table = CarbonDensityTable::from_config(&config);
        let repository = Arc::new(ArtifactRepository::with_capacity(config.max_sessions));
        Ok(Self {
            config,
            table,
            source,
            repository,
            resolver: BoundaryResolver::default(),
            progress: Arc::new(TracingProgress),
        })
    }

    pub fn with_repository(mut self, repository: Arc<ArtifactRepository>) -> Self {
        self.repository = repository;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_resolver(mut self, resolver: BoundaryResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn table(&self) -> &CarbonDensityTable {
        &self.table
    }

    pub fn repository(&self) -> &Arc<ArtifactRepository> {
        &self.repository
    }

    fn analyzer(&self) -> ComparativeAnalyzer<'_> {
        ComparativeAnalyzer::new(self.source.as_ref(), &self.table, &self.config)
    }

    fn run<T>(&self, operation: &str, body: impl FnOnce() -> CarbonResult<T>) -> CarbonResult<T> {
        ProgressRun::start(self.progress.as_ref(), operation).finish(body())
    }

    /// Structural validation. Never fails; the verdict is in the result.
    pub fn validate_boundary(&self, payload: &Value) -> GeometryValidation {
        let run = ProgressRun::start(self.progress.as_ref(), "validate_boundary");
        let validation = validate_geometry(payload);
        run.complete(validation.reason.clone());
        validation
    }

    /// Validate a payload and compute its area and bounds.
    pub fn boundary_summary(&self, payload: &Value) -> CarbonResult<BoundarySummary> {
        self.run("boundary_summary", || {
            let boundary = parse_boundary(payload)?;
            Ok(BoundarySummary {
                geometry_type: payload
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                polygon_count: boundary.polygons.len(),
                area_ha: boundary.area_ha(),
                bounds: boundary.bounds(),
            })
        })
    }

    /// Validate and store a boundary in a session. A missing id gets a UUID.
    #[instrument(skip(self, payload))]
    pub fn register_boundary(
        &self,
        session: &str,
        id: Option<&str>,
        name: Option<&str>,
        payload: &Value,
    ) -> CarbonResult<StoredBoundary> {
        self.run("register_boundary", || {
            let boundary = parse_boundary(payload)?;
            let id = id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
            let stored = StoredBoundary::new(id, name.map(str::to_string), boundary);
            self.repository.put_boundary(session, stored.clone());
            info!(id = %stored.id, area_ha = stored.boundary.area_ha(), "Registered boundary");
            Ok(stored)
        })
    }

    /// Resolve a boundary key (id, pattern or `"latest"`) in a session.
    pub fn resolve_boundary(&self, session: &str, key: &str) -> CarbonResult<StoredBoundary> {
        self.repository
            .with_session(session, |artifacts| self.resolver.resolve(key, artifacts))
            .flatten()
            .ok_or_else(|| {
                CarbonError::missing(format!("boundary '{}' in session '{}'", key, session))
            })
    }

    /// Carbon stock inside a stored boundary for one year.
    #[instrument(skip(self))]
    pub fn carbon_stock(&self, session: &str, key: &str, year: i32) -> CarbonResult<CarbonStockReport> {
        self.run("carbon_stock", || {
            let stored = self.resolve_boundary(session, key)?;
            self.analyzer().stock_for_year(year, &stored.boundary)
        })
    }

    /// Compare each year against its predecessor and keep the measurements.
    #[instrument(skip(self))]
    pub fn compare_years(
        &self,
        session: &str,
        key: &str,
        years: &[i32],
    ) -> CarbonResult<ComparativeAnalysis> {
        self.run("compare_years", || {
            let stored = self.resolve_boundary(session, key)?;
            let analysis = self.analyzer().analyze(years, &stored.boundary)?;
            self.repository
                .put_measurements(session, &analysis.measurements);
            Ok(analysis)
        })
    }

    /// Verify a reported series against the session's stored measurements.
    #[instrument(skip(self, reported))]
    pub fn verify(
        &self,
        session: &str,
        reported: &BTreeMap<i32, f64>,
        metric: ComparisonMetric,
    ) -> CarbonResult<VerificationReport> {
        self.run("verify", || {
            let measurements = self.repository.measurements(session);
            if measurements.is_empty() {
                return Err(CarbonError::missing(format!(
                    "measurements in session '{}'",
                    session
                )));
            }
            match_series(
                &measurements,
                reported,
                metric,
                self.config.match_tolerance_percent,
            )
        })
    }

    /// Verify a reported series against explicit measurements.
    pub fn verify_measurements(
        &self,
        measurements: &[YearMeasurement],
        reported: &BTreeMap<i32, f64>,
        metric: ComparisonMetric,
    ) -> CarbonResult<VerificationReport> {
        self.run("verify", || {
            match_series(
                measurements,
                reported,
                metric,
                self.config.match_tolerance_percent,
            )
        })
    }

    /// Overlap of a stored boundary with a reference payload.
    ///
    /// A missing or invalid reference is not an error: it reports no overlap.
    #[instrument(skip(self, reference))]
    pub fn overlap(
        &self,
        session: &str,
        key: &str,
        reference: Option<&Value>,
    ) -> CarbonResult<OverlapResult> {
        self.run("overlap", || {
            let stored = self.resolve_boundary(session, key)?;
            Ok(overlap_with_reference(
                &stored.boundary,
                reference,
                self.config.overlap_sample_resolution,
            ))
        })
    }

    /// Overlap between two stored boundaries.
    pub fn overlap_stored(
        &self,
        session: &str,
        project_key: &str,
        reference_key: &str,
    ) -> CarbonResult<OverlapResult> {
        self.run("overlap", || {
            let project = self.resolve_boundary(session, project_key)?;
            let reference = self.resolve_boundary(session, reference_key)?;
            Ok(compute_overlap(
                &project.boundary,
                &reference.boundary,
                self.config.overlap_sample_resolution,
            ))
        })
    }
}
