//! Tunable parameters for route consolidation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the engine chooses which routes to attempt removing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Try every removal subset (bounded by the subset caps) and keep the
    /// one that eliminates the most routes. Exponential in the route count.
    #[default]
    Exhaustive,
    /// Repeatedly remove the first removable route until none is left.
    Greedy,
}

/// Configuration threaded through every consolidation call.
///
/// Defaults reproduce the reference thresholds: capacity 60, detour
/// threshold 3.0, no ignorable demand, no margin, unbounded search.
///
/// # Examples
///
/// ```
/// use u_consolidate::config::{MergeConfig, SearchStrategy};
///
/// let config = MergeConfig::default()
///     .with_capacity_limit(45.0)
///     .with_ignore_threshold(1.0)
///     .with_max_ignored_demand(3.0)
///     .with_max_subset_size(4);
/// assert_eq!(config.capacity_limit, 45.0);
/// assert_eq!(config.strategy, SearchStrategy::Exhaustive);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Maximum total demand a surviving route may carry.
    pub capacity_limit: f64,
    /// Insertions with a detour cost at or above this are inadmissible.
    pub detour_threshold: f64,
    /// Non-faculty stops with demand at or below this are dropped instead of placed.
    pub ignore_threshold: f64,
    /// Budget of dropped demand per eliminated route.
    pub max_ignored_demand: f64,
    /// How much nearer the hub an inserted stop must be than its predecessor.
    pub min_closer_margin: f64,
    /// Largest removal subset tried by the exhaustive search.
    pub max_subset_size: Option<usize>,
    /// Total number of combinations the exhaustive search may evaluate.
    pub max_combinations: Option<usize>,
    pub strategy: SearchStrategy,
    /// Evaluate independent trials on the rayon thread pool.
    pub parallel: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            capacity_limit: 60.0,
            detour_threshold: 3.0,
            ignore_threshold: 0.0,
            max_ignored_demand: 0.0,
            min_closer_margin: 0.0,
            max_subset_size: None,
            max_combinations: None,
            strategy: SearchStrategy::Exhaustive,
            parallel: false,
        }
    }
}

impl MergeConfig {
    /// Parses a configuration from JSON; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_capacity_limit(mut self, capacity: f64) -> Self {
        self.capacity_limit = capacity;
        self
    }

    pub fn with_detour_threshold(mut self, threshold: f64) -> Self {
        self.detour_threshold = threshold;
        self
    }

    pub fn with_ignore_threshold(mut self, threshold: f64) -> Self {
        self.ignore_threshold = threshold;
        self
    }

    pub fn with_max_ignored_demand(mut self, budget: f64) -> Self {
        self.max_ignored_demand = budget;
        self
    }

    pub fn with_min_closer_margin(mut self, margin: f64) -> Self {
        self.min_closer_margin = margin;
        self
    }

    pub fn with_max_subset_size(mut self, size: usize) -> Self {
        self.max_subset_size = Some(size);
        self
    }

    pub fn with_max_combinations(mut self, count: usize) -> Self {
        self.max_combinations = Some(count);
        self
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks that every threshold is finite and non-negative and that the
    /// search caps, when set, allow at least one trial.
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("capacity_limit", self.capacity_limit),
            ("detour_threshold", self.detour_threshold),
            ("ignore_threshold", self.ignore_threshold),
            ("max_ignored_demand", self.max_ignored_demand),
            ("min_closer_margin", self.min_closer_margin),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::invalid_config(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.max_subset_size == Some(0) {
            return Err(Error::invalid_config("max_subset_size must be at least 1"));
        }
        if self.max_combinations == Some(0) {
            return Err(Error::invalid_config("max_combinations must be at least 1"));
        }
        Ok(())
    }
}
