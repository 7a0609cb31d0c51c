//! Boundary lookup over a session's artifacts.
//!
//! A [`BoundaryResolver`] tries an ordered list of strategies and returns the
//! first hit. The default order is exact id, then case-insensitive pattern
//! match on id and name, then the latest boundary for the `"latest"` sentinel.

use tracing::debug;

use crate::artifacts::{SessionArtifacts, StoredBoundary};

/// Key that selects the most recently registered boundary.
pub const LATEST_SENTINEL: &str = "latest";

/// One way of turning a key into a stored boundary.
pub trait ResolutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(&self, key: &str, artifacts: &SessionArtifacts) -> Option<StoredBoundary>;
}

/// Exact id match.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactId;

impl ResolutionStrategy for ExactId {
    fn name(&self) -> &'static str {
        "exact_id"
    }

    fn resolve(&self, key: &str, artifacts: &SessionArtifacts) -> Option<StoredBoundary> {
        artifacts.boundaries.get(key).cloned()
    }
}

/// Case-insensitive substring match on id or name. Newest match wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternMatch;

impl ResolutionStrategy for PatternMatch {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn resolve(&self, key: &str, artifacts: &SessionArtifacts) -> Option<StoredBoundary> {
        let needle = key.trim().to_lowercase();
        if needle.is_empty() || needle == LATEST_SENTINEL {
            return None;
        }

        let hit = |s: &str| s.to_lowercase().contains(&needle);
        artifacts
            .boundaries
            .list_all()
            .filter(|(id, b)| hit(id) || b.name.as_deref().is_some_and(|n| hit(n)))
            .last()
            .map(|(_, b)| b.clone())
    }
}

/// Latest boundary, only for the sentinel or an empty key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Latest;

impl ResolutionStrategy for Latest {
    fn name(&self) -> &'static str {
        "latest"
    }

    fn resolve(&self, key: &str, artifacts: &SessionArtifacts) -> Option<StoredBoundary> {
        let key = key.trim();
        if key.is_empty() || key.eq_ignore_ascii_case(LATEST_SENTINEL) {
            artifacts.boundaries.get_latest().cloned()
        } else {
            None
        }
    }
}

/// Ordered composition of strategies.
pub struct BoundaryResolver {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl Default for BoundaryResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExactId),
            Box::new(PatternMatch),
            Box::new(Latest),
        ])
    }
}

impl BoundaryResolver {
    pub fn new(strategies: Vec<Box<dyn ResolutionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, key: &str, artifacts: &SessionArtifacts) -> Option<StoredBoundary> {
        self.strategies.iter().find_map(|s| {
            let hit = s.resolve(key, artifacts)?;
            debug!(key, strategy = s.name(), id = %hit.id, "Resolved boundary");
            Some(hit)
        })
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}
