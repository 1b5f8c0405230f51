//! Engine configuration.
//!
//! Search budgets, scoring weights and ranking options, loadable from TOML
//! so policy (e.g., `W_hard`, `W_soft`) can change without code changes.
//!
//! # Examples
//!
//! ```
//! use u_timetable::config::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     [search]
//!     max_nodes = 5000
//!
//!     [scoring]
//!     hard_weight = 15.0
//!
//!     [ranking]
//!     option_count = 6
//!     base_seed = 7
//! "#).unwrap();
//!
//! assert_eq!(config.search.max_nodes, 5000);
//! assert_eq!(config.ranking.option_count, 6);
//! // Unset keys keep their defaults
//! assert_eq!(config.scoring.soft_weight, 0.5);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constraints::SoftWeights;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub scoring: ScoringConfig,
    pub soft_weights: SoftWeights,
    pub ranking: RankingConfig,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.max_nodes == 0 {
            return Err(ConfigError::Invalid("search.max_nodes must be positive".into()));
        }
        if self.search.max_alternatives == 0 {
            return Err(ConfigError::Invalid(
                "search.max_alternatives must be positive".into(),
            ));
        }
        if !(self.search.selection_greediness.is_finite() && self.search.selection_greediness >= 0.0)
        {
            return Err(ConfigError::Invalid(
                "search.selection_greediness must be a non-negative number".into(),
            ));
        }
        for (name, w) in [
            ("scoring.hard_weight", self.scoring.hard_weight),
            ("scoring.soft_weight", self.scoring.soft_weight),
        ] {
            if !(w.is_finite() && w >= 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be non-negative")));
            }
        }
        if !self.soft_weights.is_valid() {
            return Err(ConfigError::Invalid(
                "soft_weights must all be non-negative".into(),
            ));
        }
        if self.ranking.option_count == 0 {
            return Err(ConfigError::Invalid(
                "ranking.option_count must be positive".into(),
            ));
        }
        if self.ranking.top_n == Some(0) {
            return Err(ConfigError::Invalid("ranking.top_n must be positive".into()));
        }
        Ok(())
    }

    /// Sets the node budget.
    pub fn with_max_nodes(mut self, max_nodes: u64) -> Self {
        self.search.max_nodes = max_nodes;
        self
    }

    /// Sets the scoring weights.
    pub fn with_weights(mut self, hard_weight: f64, soft_weight: f64) -> Self {
        self.scoring.hard_weight = hard_weight;
        self.scoring.soft_weight = soft_weight;
        self
    }

    /// Sets the ranking seed base.
    pub fn with_base_seed(mut self, seed: u64) -> Self {
        self.ranking.base_seed = seed;
        self
    }

    /// Sets the number of generation runs.
    pub fn with_option_count(mut self, count: usize) -> Self {
        self.ranking.option_count = count;
        self
    }
}

/// Candidate generator budgets and selection pressure.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum search nodes per run.
    pub max_nodes: u64,
    /// Backtracks allowed per dead end before the session is given up.
    pub backtrack_limit: u32,
    /// Alternatives kept per bound session for backtracking.
    pub max_alternatives: usize,
    /// How strongly low-penalty placements are preferred (0 = uniform).
    pub selection_greediness: f64,
    /// Wall-clock limit per run. Results are not reproducible when set.
    pub time_limit_ms: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_nodes: 200_000,
            backtrack_limit: 200,
            max_alternatives: 32,
            selection_greediness: 1.0,
            time_limit_ms: None,
        }
    }
}

impl SearchConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }
}

/// Scoring weights: `score = 100 - hard * hard_weight - soft * soft_weight`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// `W_hard`: points lost per hard conflict.
    pub hard_weight: f64,
    /// `W_soft`: points lost per unit of weighted soft penalty.
    pub soft_weight: f64,
    /// Consecutive teaching hours before the soft penalty applies.
    pub max_consecutive_hours: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            hard_weight: 10.0,
            soft_weight: 0.5,
            max_consecutive_hours: 3,
        }
    }
}

/// Ranking options.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Generation runs per ranking call.
    pub option_count: usize,
    /// Run `i` uses seed `base_seed + i`.
    pub base_seed: u64,
    /// Keep only the best N distinct candidates.
    pub top_n: Option<usize>,
    /// Run generations on the rayon pool.
    pub parallel: bool,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            option_count: 3,
            base_seed: 42,
            top_n: None,
            parallel: true,
        }
    }
}

impl ScoringConfig {
    /// Quality score in [0, 100].
    pub fn score(&self, hard_conflicts: usize, soft_penalty: f64) -> f64 {
        let raw = 100.0 - hard_conflicts as f64 * self.hard_weight - soft_penalty * self.soft_weight;
        if raw.is_nan() {
            return 0.0;
        }
        raw.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_clamped() {
        let scoring = ScoringConfig::default();
        assert_eq!(scoring.score(0, 0.0), 100.0);
        assert_eq!(scoring.score(1, 4.0), 88.0);
        assert_eq!(scoring.score(20, 0.0), 0.0);
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scoring.hard_weight, 10.0);
        assert_eq!(config.ranking.option_count, 3);
        assert_eq!(config.search.time_limit(), None);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_soft_weights_section() {
        let config = EngineConfig::from_toml_str(
            r#"
            [soft_weights]
            gap = 4.0
            preference = 0.0
            "#,
        )
        .unwrap();
        assert_eq!(config.soft_weights.gap, 4.0);
        assert_eq!(config.soft_weights.preference, 0.0);
        assert_eq!(
            config.soft_weights.clustering,
            SoftWeights::default().clustering
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_toml_str("[search]\nmax_nodes = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_toml_str("[scoring]\nsoft_weight = -1.0").unwrap_err();
        assert!(err.to_string().contains("scoring.soft_weight"));

        let err = EngineConfig::from_toml_str("[ranking]\ntop_n = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = EngineConfig::from_toml_str("[search\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load("/nonexistent/u-timetable.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new()
            .with_max_nodes(10)
            .with_weights(20.0, 1.0)
            .with_base_seed(9)
            .with_option_count(5);
        assert_eq!(config.search.max_nodes, 10);
        assert_eq!(config.scoring.hard_weight, 20.0);
        assert_eq!(config.ranking.base_seed, 9);
        assert_eq!(config.ranking.option_count, 5);
    }
}
