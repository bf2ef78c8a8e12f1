//! Configuration system for StoreForge.
//!
//! Load clustering configuration from TOML or YAML files to control the
//! cluster size bounds, the covariate band, seasonal weights and the repair
//! budget without code changes.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use storeforge_config::ClusteringConfig;
//! use std::time::Duration;
//!
//! let config = ClusteringConfig::from_toml_str(r#"
//!     random_seed = 7
//!
//!     [constraints]
//!     min_stores_per_cluster = 35
//!     max_stores_per_cluster = 50
//!     target_stores_per_cluster = 42
//!     max_covariate_range = 4.5
//!     recent_weight = 0.7
//!     reference_weight = 0.3
//!
//!     [rebalance]
//!     oscillation_window = 5
//!     time_limit_millis = 30000
//! "#).unwrap();
//!
//! assert_eq!(config.constraints.max_stores_per_cluster, 50);
//! assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
//! assert!(config.validate().is_ok());
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use storeforge_config::ClusteringConfig;
//!
//! let config = ClusteringConfig::load("clustering.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storeforge_core::ClusteringError;
use thiserror::Error;

/// Tolerance for the `recent_weight + reference_weight == 1` check.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for ClusteringError {
    fn from(err: ConfigError) -> Self {
        ClusteringError::Config(err.to_string())
    }
}

/// Main clustering run configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ClusteringConfig {
    /// Seed for the only random source of a run (base clustering restarts).
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,

    /// Hard constraints and seasonal weights.
    #[serde(default)]
    pub constraints: ConstraintConfig,

    /// Initial partition settings.
    #[serde(default)]
    pub base_clustering: BaseClusteringConfig,

    /// Repair loop settings.
    #[serde(default)]
    pub rebalance: RebalanceConfig,
}

fn default_random_seed() -> u64 {
    42
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            random_seed: default_random_seed(),
            constraints: ConstraintConfig::default(),
            base_clustering: BaseClusteringConfig::default(),
            rebalance: RebalanceConfig::default(),
        }
    }
}

impl ClusteringConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Replaces the constraint configuration.
    pub fn with_constraints(mut self, constraints: ConstraintConfig) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sets the repair iteration budget (number of moves).
    pub fn with_iteration_budget(mut self, budget: u64) -> Self {
        self.rebalance.iteration_budget = Some(budget);
        self
    }

    /// Sets the wall-clock watchdog for the repair loop.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.rebalance.time_limit_millis = Some(limit.as_millis() as u64);
        self
    }

    /// Sets the number of base clustering restarts.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.base_clustering.n_init = n_init;
        self
    }

    /// Returns the repair wall-clock limit, if configured.
    ///
    /// Convenience method that delegates to `rebalance.time_limit()`.
    pub fn time_limit(&self) -> Option<Duration> {
        self.rebalance.time_limit()
    }

    /// Checks every section for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.constraints.validate()?;
        self.base_clustering.validate()?;
        self.rebalance.validate()
    }
}

/// Hard constraints and seasonal blending weights for one run.
///
/// Created once per run and never mutated during clustering.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ConstraintConfig {
    /// Smallest allowed cluster.
    pub min_stores_per_cluster: usize,

    /// Largest allowed cluster.
    pub max_stores_per_cluster: usize,

    /// Preferred cluster size; drives the optimal cluster count.
    pub target_stores_per_cluster: usize,

    /// Largest allowed covariate spread (max − min) inside a cluster.
    pub max_covariate_range: f64,

    /// Weight of the most recently completed season.
    pub recent_weight: f64,

    /// Weight of the year-over-year reference season.
    pub reference_weight: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            min_stores_per_cluster: 35,
            max_stores_per_cluster: 50,
            target_stores_per_cluster: 42,
            max_covariate_range: 5.0,
            recent_weight: 0.6,
            reference_weight: 0.4,
        }
    }
}

impl ConstraintConfig {
    /// Creates size bounds with default covariate range and weights.
    pub fn with_sizes(min: usize, max: usize, target: usize) -> Self {
        Self {
            min_stores_per_cluster: min,
            max_stores_per_cluster: max,
            target_stores_per_cluster: target,
            ..Self::default()
        }
    }

    /// Sets the maximum covariate range.
    pub fn with_max_covariate_range(mut self, range: f64) -> Self {
        self.max_covariate_range = range;
        self
    }

    /// Sets the seasonal weights.
    pub fn with_weights(mut self, recent: f64, reference: f64) -> Self {
        self.recent_weight = recent;
        self.reference_weight = reference;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let min = self.min_stores_per_cluster;
        let max = self.max_stores_per_cluster;
        let target = self.target_stores_per_cluster;

        if min == 0 {
            return Err(ConfigError::Invalid(
                "min_stores_per_cluster must be at least 1".to_string(),
            ));
        }
        if min > max {
            return Err(ConfigError::Invalid(format!(
                "min_stores_per_cluster ({min}) exceeds max_stores_per_cluster ({max})"
            )));
        }
        if target < min || target > max {
            return Err(ConfigError::Invalid(format!(
                "target_stores_per_cluster ({target}) must lie in [{min}, {max}]"
            )));
        }
        if !self.max_covariate_range.is_finite() || self.max_covariate_range < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_covariate_range must be a finite non-negative number, got {}",
                self.max_covariate_range
            )));
        }
        for (name, weight) in [
            ("recent_weight", self.recent_weight),
            ("reference_weight", self.reference_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must lie in [0, 1], got {weight}"
                )));
            }
        }
        let sum = self.recent_weight + self.reference_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Invalid(format!(
                "recent_weight + reference_weight must equal 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Initial (unconstrained) partition settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BaseClusteringConfig {
    /// Number of independent seeded restarts; the lowest inertia wins.
    pub n_init: usize,

    /// Relocation rounds per restart.
    pub max_iterations: usize,
}

impl Default for BaseClusteringConfig {
    fn default() -> Self {
        Self {
            n_init: 10,
            max_iterations: 300,
        }
    }
}

impl BaseClusteringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_init == 0 {
            return Err(ConfigError::Invalid("n_init must be at least 1".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Repair loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RebalanceConfig {
    /// Maximum number of moves. Derived from the problem size when unset.
    pub iteration_budget: Option<u64>,

    /// A store moved back into a cluster it left within this many
    /// iterations is pinned.
    pub oscillation_window: usize,

    /// Optional wall-clock watchdog.
    pub time_limit_millis: Option<u64>,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            iteration_budget: None,
            oscillation_window: 5,
            time_limit_millis: None,
        }
    }
}

impl RebalanceConfig {
    /// Returns the time limit as a Duration, if any.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_millis.map(Duration::from_millis)
    }

    /// Returns the configured budget or `max(10 × clusters, stores)`.
    pub fn iteration_budget_for(&self, cluster_count: usize, store_count: usize) -> u64 {
        self.iteration_budget
            .unwrap_or_else(|| (10 * cluster_count).max(store_count) as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oscillation_window == 0 {
            return Err(ConfigError::Invalid(
                "oscillation_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
