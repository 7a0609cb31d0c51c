//! Configuration for the carbon engine.
//!
//! All heuristic constants live here so they can be tuned and tested in one
//! place: the leakage factor, the credit price band, the density used for
//! unmapped land-cover classes, the discrepancy match band and the trend
//! threshold.

use std::collections::BTreeMap;
use std::path::Path;

use carbon_common::{CarbonError, ClassCode};
use carbon_geometry::{
    DEFAULT_PARALLEL_THRESHOLD, DEFAULT_SAMPLE_RESOLUTION, MAX_SAMPLE_RESOLUTION,
};
use serde::{Deserialize, Serialize};

use crate::artifacts::DEFAULT_MAX_SESSIONS;

/// Configuration for the carbon engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fraction of positive forest growth deducted as leakage.
    pub leakage_factor: f64,

    /// Lower credit price per unit of net sequestration.
    pub min_credit_price: f64,

    /// Upper credit price per unit of net sequestration.
    pub max_credit_price: f64,

    /// Carbon density (Mg C/ha) for class codes missing from the table.
    pub default_carbon_density: f64,

    /// Absolute discrepancy percentage at or below which figures match.
    pub match_tolerance_percent: f64,

    /// Relative yearly slope at or below which a series is stable.
    pub trend_stable_threshold: f64,

    /// Lattice samples per axis when estimating overlap area.
    pub overlap_sample_resolution: usize,

    /// Point count above which boundary filtering runs in parallel.
    pub parallel_filter_threshold: usize,

    /// Sessions retained by the artifact repository before the least
    /// recently used one is evicted.
    pub max_sessions: usize,

    /// Per-class density replacements applied on top of the built-in table.
    pub density_overrides: BTreeMap<ClassCode, f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            leakage_factor: 0.10,
            min_credit_price: 5.0,
            max_credit_price: 15.0,
            default_carbon_density: 0.0,
            match_tolerance_percent: 1.0,
            trend_stable_threshold: 0.01,
            overlap_sample_resolution: DEFAULT_SAMPLE_RESOLUTION,
            parallel_filter_threshold: DEFAULT_PARALLEL_THRESHOLD,
            max_sessions: DEFAULT_MAX_SESSIONS,
            density_overrides: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables over the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse("CARBON_LEAKAGE_FACTOR") {
            config.leakage_factor = v;
        }
        if let Some(v) = env_parse("CARBON_MIN_CREDIT_PRICE") {
            config.min_credit_price = v;
        }
        if let Some(v) = env_parse("CARBON_MAX_CREDIT_PRICE") {
            config.max_credit_price = v;
        }
        if let Some(v) = env_parse("CARBON_DEFAULT_DENSITY") {
            config.default_carbon_density = v;
        }
        if let Some(v) = env_parse("CARBON_MATCH_TOLERANCE_PCT") {
            config.match_tolerance_percent = v;
        }
        if let Some(v) = env_parse("CARBON_TREND_THRESHOLD") {
            config.trend_stable_threshold = v;
        }
        if let Some(v) = env_parse("CARBON_OVERLAP_RESOLUTION") {
            config.overlap_sample_resolution = v;
        }
        if let Some(v) = env_parse("CARBON_PARALLEL_THRESHOLD") {
            config.parallel_filter_threshold = v;
        }
        if let Some(v) = env_parse("CARBON_MAX_SESSIONS") {
            config.max_sessions = v;
        }

        config
    }

    /// Parse a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(s: &str) -> Result<Self, CarbonError> {
        let config: Self = serde_yaml::from_str(s)
            .map_err(|e| CarbonError::InvalidConfig(format!("YAML error: {}", e)))?;
        config.validate().map_err(CarbonError::InvalidConfig)?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, CarbonError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CarbonError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.leakage_factor) {
            return Err("leakage_factor must be in [0, 1)".to_string());
        }

        if !self.min_credit_price.is_finite() || self.min_credit_price < 0.0 {
            return Err("min_credit_price must be >= 0".to_string());
        }

        if !self.max_credit_price.is_finite() || self.max_credit_price < self.min_credit_price {
            return Err("max_credit_price must be >= min_credit_price".to_string());
        }

        if !self.default_carbon_density.is_finite() || self.default_carbon_density < 0.0 {
            return Err("default_carbon_density must be >= 0".to_string());
        }

        if !self.match_tolerance_percent.is_finite() || self.match_tolerance_percent < 0.0 {
            return Err("match_tolerance_percent must be >= 0".to_string());
        }

        if !self.trend_stable_threshold.is_finite() || self.trend_stable_threshold < 0.0 {
            return Err("trend_stable_threshold must be >= 0".to_string());
        }

        if self.overlap_sample_resolution == 0
            || self.overlap_sample_resolution > MAX_SAMPLE_RESOLUTION
        {
            return Err(format!(
                "overlap_sample_resolution must be in 1..={}",
                MAX_SAMPLE_RESOLUTION
            ));
        }

        if self.max_sessions == 0 {
            return Err("max_sessions must be > 0".to_string());
        }

        if let Some((code, density)) = self
            .density_overrides
            .iter()
            .find(|(_, d)| !d.is_finite() || **d < 0.0)
        {
            return Err(format!(
                "density override for class {} must be >= 0, got {}",
                code, density
            ));
        }

        Ok(())
    }

    /// Credit band for a net sequestration figure; zero unless positive.
    pub fn credit_band(&self, net_sequestration: f64) -> (f64, f64) {
        if net_sequestration > 0.0 {
            (
                net_sequestration * self.min_credit_price,
                net_sequestration * self.max_credit_price,
            )
        } else {
            (0.0, 0.0)
        }
    }

    /// Leakage for a growth figure; zero unless growth is positive.
    pub fn leakage(&self, forest_growth: f64) -> f64 {
        if forest_growth > 0.0 {
            self.leakage_factor * forest_growth
        } else {
            0.0
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.leakage_factor, 0.10);
        assert_eq!(config.min_credit_price, 5.0);
        assert_eq!(config.max_credit_price, 15.0);
        assert_eq!(config.default_carbon_density, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.leakage_factor = 1.5;
        assert!(config.validate().is_err());

        config = EngineConfig::default();
        config.min_credit_price = 20.0;
        assert!(config.validate().is_err());

        config = EngineConfig::default();
        config.default_carbon_density = -1.0;
        assert!(config.validate().is_err());

        config = EngineConfig::default();
        config.overlap_sample_resolution = 0;
        assert!(config.validate().is_err());

        config = EngineConfig::default();
        config.overlap_sample_resolution = 100_000;
        assert!(config.validate().is_err());
        config.overlap_sample_resolution = MAX_SAMPLE_RESOLUTION;
        assert!(config.validate().is_ok());

        config = EngineConfig::default();
        config.max_sessions = 0;
        assert!(config.validate().is_err());

        config = EngineConfig::default();
        config.density_overrides.insert(10, -5.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_leakage_only_on_positive_growth() {
        let config = EngineConfig::default();
        assert!((config.leakage(100.0) - 10.0).abs() < 1e-12);
        assert_eq!(config.leakage(0.0), 0.0);
        assert_eq!(config.leakage(-50.0), 0.0);
    }

    #[test]
    fn test_credit_band() {
        let config = EngineConfig::default();
        assert_eq!(config.credit_band(10.0), (50.0, 150.0));
        assert_eq!(config.credit_band(-3.0), (0.0, 0.0));
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = EngineConfig::from_yaml_str(
            "leakage_factor: 0.2\nmax_credit_price: 30.0\ndensity_overrides:\n  10: 95.5\n",
        )
        .unwrap();
        assert_eq!(config.leakage_factor, 0.2);
        assert_eq!(config.max_credit_price, 30.0);
        assert_eq!(config.min_credit_price, 5.0);
        assert_eq!(config.density_overrides.get(&10), Some(&95.5));
    }

    #[test]
    fn test_from_yaml_rejects_invalid() {
        let err = EngineConfig::from_yaml_str("leakage_factor: 2.0\n").unwrap_err();
        assert!(matches!(err, CarbonError::InvalidConfig(_)));
    }
}
