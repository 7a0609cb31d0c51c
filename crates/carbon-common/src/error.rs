//! Error taxonomy shared by the carbon MRV engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using CarbonError.
pub type CarbonResult<T> = Result<T, CarbonError>;

/// Which kind of emptiness ended an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyKind {
    /// No grid point fell inside the boundary.
    NoPointsInBoundary,
    /// Reported and computed series share no year.
    NoOverlappingYears,
    /// No year survived with both its grid and its baseline grid.
    NoAnalyzableData,
}

impl std::fmt::Display for EmptyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EmptyKind::NoPointsInBoundary => "no points inside boundary",
            EmptyKind::NoOverlappingYears => "no overlapping years",
            EmptyKind::NoAnalyzableData => "no analyzable data",
        };
        f.write_str(s)
    }
}

/// Primary error type for engine operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CarbonError {
    /// A grid year or boundary could not be resolved.
    #[error("Resource not found: {0}")]
    MissingResource(String),

    /// The boundary failed structural validation.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The operation produced nothing to report.
    #[error("Empty result: {kind}: {detail}")]
    EmptyResult { kind: EmptyKind, detail: String },

    /// A grid row could not be parsed. Recovered by the loader.
    #[error("Malformed row {line}: {message}")]
    MalformedRow { line: usize, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CarbonError {
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingResource(what.into())
    }

    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub fn empty(kind: EmptyKind, detail: impl Into<String>) -> Self {
        Self::EmptyResult {
            kind,
            detail: detail.into(),
        }
    }

    /// Short machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            CarbonError::MissingResource(_) => "MissingResource",
            CarbonError::InvalidGeometry(_) => "InvalidGeometry",
            CarbonError::EmptyResult { .. } => "EmptyResult",
            CarbonError::MalformedRow { .. } => "MalformedRow",
            CarbonError::InvalidConfig(_) => "InvalidConfig",
            CarbonError::InvalidInput(_) => "InvalidInput",
        }
    }

    /// Whether a bulk loop over years or rows may skip this error and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CarbonError::MissingResource(_) | CarbonError::MalformedRow { .. }
        )
    }
}

impl From<serde_json::Error> for CarbonError {
    fn from(err: serde_json::Error) -> Self {
        CarbonError::InvalidInput(format!("JSON error: {}", err))
    }
}
