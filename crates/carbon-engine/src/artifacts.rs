//! Per-session artifact repository.
//!
//! Boundaries registered and measurements computed during a session are kept
//! here so later requests can refer to them by id or by the `"latest"`
//! sentinel. The repository is injected into the engine; nothing is scanned
//! from global state.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use carbon_geometry::Boundary;
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analyzer::YearMeasurement;

/// Ordered key-value store; the most recent insert is the latest.
#[derive(Debug, Clone)]
pub struct ArtifactStore<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for ArtifactStore<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> ArtifactStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced entry becomes the latest.
    pub fn insert(&mut self, id: impl Into<String>, value: T) {
        let id = id.into();
        self.entries.retain(|(k, _)| *k != id);
        self.entries.push((id, value));
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    pub fn get_latest(&self) -> Option<&T> {
        self.entries.last().map(|(_, v)| v)
    }

    /// All entries, oldest first.
    pub fn list_all(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A validated boundary registered in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBoundary {
    pub id: String,
    pub name: Option<String>,
    pub boundary: Boundary,
    pub created_at: DateTime<Utc>,
}

impl StoredBoundary {
    pub fn new(id: impl Into<String>, name: Option<String>, boundary: Boundary) -> Self {
        Self {
            id: id.into(),
            name,
            boundary,
            created_at: Utc::now(),
        }
    }
}

/// Everything retained for one session.
#[derive(Debug, Clone, Default)]
pub struct SessionArtifacts {
    pub boundaries: ArtifactStore<StoredBoundary>,
    /// Measurements keyed by year.
    pub measurements: ArtifactStore<YearMeasurement>,
}

impl SessionArtifacts {
    /// Stored measurements ordered by year.
    pub fn measurements_by_year(&self) -> Vec<YearMeasurement> {
        let mut all: Vec<YearMeasurement> =
            self.measurements.list_all().map(|(_, m)| m.clone()).collect();
        all.sort_by_key(|m| m.year);
        all
    }
}

/// Sessions retained when no capacity is configured.
pub const DEFAULT_MAX_SESSIONS: usize = 256;

/// Lookup and eviction counters for the repository.
#[derive(Debug, Default)]
pub struct RepositoryStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl RepositoryStats {
    /// Hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

/// Session id → artifacts, shared across requests.
///
/// Holds at most `capacity` sessions; creating one more evicts the least
/// recently used session.
pub struct ArtifactRepository {
    sessions: Mutex<LruCache<String, SessionArtifacts>>,
    stats: RepositoryStats,
}

impl ArtifactRepository {
    pub fn new(capacity: NonZeroUsize) -> Self {
        info!(capacity = capacity.get(), "Artifact repository initialized");
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            stats: RepositoryStats::default(),
        }
    }

    /// Repository for `capacity` sessions; zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN))
    }

    // Every access updates recency, so reads also take the lock exclusively.
    // Writers only insert or remove whole entries; poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, SessionArtifacts>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` against a session's artifacts, creating the session if needed.
    fn update<R>(&self, session: &str, f: impl FnOnce(&mut SessionArtifacts) -> R) -> R {
        let mut sessions = self.lock();
        if let Some(artifacts) = sessions.get_mut(session) {
            return f(artifacts);
        }

        let mut artifacts = SessionArtifacts::default();
        let result = f(&mut artifacts);
        if let Some((evicted, _)) = sessions.push(session.to_string(), artifacts) {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(session = %evicted, "Evicted least recently used session");
        }
        result
    }

    pub fn put_boundary(&self, session: &str, stored: StoredBoundary) {
        self.update(session, |artifacts| {
            artifacts.boundaries.insert(stored.id.clone(), stored)
        });
    }

    pub fn put_measurements(&self, session: &str, measurements: &[YearMeasurement]) {
        self.update(session, |artifacts| {
            for m in measurements {
                artifacts.measurements.insert(m.year.to_string(), m.clone());
            }
        });
    }

    /// Run `f` against a session's artifacts, if the session exists.
    pub fn with_session<R>(&self, session: &str, f: impl FnOnce(&SessionArtifacts) -> R) -> Option<R> {
        let mut sessions = self.lock();
        let result = sessions.get(session).map(f);
        let counter = if result.is_some() {
            &self.stats.hits
        } else {
            &self.stats.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        result
    }

    pub fn measurements(&self, session: &str) -> Vec<YearMeasurement> {
        self.with_session(session, SessionArtifacts::measurements_by_year)
            .unwrap_or_default()
    }

    pub fn boundary_ids(&self, session: &str) -> Vec<String> {
        self.with_session(session, |s| {
            s.boundaries.list_all().map(|(id, _)| id.to_string()).collect()
        })
        .unwrap_or_default()
    }

    pub fn clear_session(&self, session: &str) -> bool {
        self.lock().pop(session).is_some()
    }

    /// Number of sessions currently retained.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> &RepositoryStats {
        &self.stats
    }
}

impl Default for ArtifactRepository {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}
