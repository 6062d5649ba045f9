//! Configuration loading from TOML with validated defaults.
//!
//! Every knob has a default equal to the documented scoring constants, so
//! `Config::default()` is a fully working setup and a config file only
//! needs to override what it changes.

use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::domain::{CategoryThresholds, PricingConfig, ScoreWeights};
use crate::error::{ConfigError, Result};
use crate::matcher::MatchingConfig;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scoring
            .weights
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                field: "scoring.weights",
                reason,
            })?;
        if self.scoring.impression_ceiling == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scoring.impression_ceiling",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.scoring.expected_ctr_by_position.is_empty() {
            return Err(ConfigError::MissingField {
                field: "scoring.expected_ctr_by_position",
            }
            .into());
        }
        Ok(())
    }
}

/// Scoring constants: factor weights, category thresholds, benchmarks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    pub thresholds: CategoryThresholds,
    pub pricing: PricingConfig,
    /// Expected organic CTR by search position, index 0 = position 1.
    pub expected_ctr_by_position: Vec<f64>,
    /// Position at which the position-gap factor saturates.
    pub max_position: f64,
    /// Impressions at which the impression factor saturates (log scale).
    pub impression_ceiling: u64,
    /// Peer-benchmark conversion rate for the conversion-gap factor.
    pub benchmark_conversion_rate: f64,
    /// Peer-benchmark average order value for the AOV-gap factor.
    pub benchmark_aov: Decimal,
    /// Target revenue per click for the monetization-gap factor.
    pub target_revenue_per_click: f64,
}

impl ScoringConfig {
    /// Expected CTR for a (1-based) average search position.
    ///
    /// Positions past the table use the last entry; a missing or
    /// non-positive position yields 0.
    #[must_use]
    pub fn expected_ctr(&self, position: f64) -> f64 {
        if position < 1.0 || !position.is_finite() {
            return 0.0;
        }
        let idx = (position.round() as usize).saturating_sub(1);
        self.expected_ctr_by_position
            .get(idx)
            .or_else(|| self.expected_ctr_by_position.last())
            .copied()
            .unwrap_or(0.0)
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            thresholds: CategoryThresholds::default(),
            pricing: PricingConfig::default(),
            // Published organic-CTR curve, positions 1 through 10.
            expected_ctr_by_position: vec![
                0.28, 0.15, 0.11, 0.08, 0.07, 0.05, 0.04, 0.03, 0.025, 0.02,
            ],
            max_position: 20.0,
            impression_ceiling: 100_000,
            benchmark_conversion_rate: 0.02,
            benchmark_aov: dec!(50),
            target_revenue_per_click: 1.0,
        }
    }
}

/// Logging setup, initialized once by the embedding application.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_partial_toml_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[scoring]\nimpression_ceiling = 50000\n\n[matching]\nworkers = 2\n"
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.scoring.impression_ceiling, 50_000);
        assert_eq!(config.matching.workers, 2);
        // Untouched sections keep defaults.
        assert!((config.scoring.weights.revenue_potential - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_bad_weights_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[scoring.weights]\ntraffic_potential = 0.9\nrevenue_potential = 0.9\npricing_opportunity = 0.0\ncompetitive_gap = 0.0\ncontent_quality = 0.0\n"
        )
        .unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_expected_ctr_lookup() {
        let scoring = ScoringConfig::default();
        assert!((scoring.expected_ctr(1.0) - 0.28).abs() < 1e-9);
        assert!((scoring.expected_ctr(3.4) - 0.11).abs() < 1e-9);
        // Past the table, the tail entry applies.
        assert!((scoring.expected_ctr(55.0) - 0.02).abs() < 1e-9);
        assert_eq!(scoring.expected_ctr(0.0), 0.0);
        assert_eq!(scoring.expected_ctr(f64::NAN), 0.0);
    }
}
