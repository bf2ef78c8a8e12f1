//! Cluster-count feasibility gate.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use storeforge_config::ConstraintConfig;
use storeforge_core::{ClusteringError, Result};

/// Valid cluster-count range for a store count and size bounds.
///
/// # Example
///
/// ```
/// use storeforge_config::ConstraintConfig;
/// use storeforge_engine::FeasibilityAnalysis;
///
/// let constraints = ConstraintConfig::with_sizes(35, 50, 42);
/// let analysis = FeasibilityAnalysis::analyze(2264, &constraints).unwrap();
///
/// assert_eq!(analysis.min_clusters, 46);
/// assert_eq!(analysis.max_clusters, 64);
/// assert_eq!(analysis.optimal_clusters, 54);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeasibilityAnalysis {
    pub store_count: usize,
    pub min_stores: usize,
    pub max_stores: usize,
    pub target_stores: usize,
    /// `ceil(store_count / max_stores)`
    pub min_clusters: usize,
    /// `floor(store_count / min_stores)`
    pub max_clusters: usize,
    /// `round(store_count / target_stores)` clipped into the valid range.
    pub optimal_clusters: usize,
}

impl FeasibilityAnalysis {
    /// Computes the valid cluster-count range and the seed cluster count.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationInfeasible` when fewer stores than
    /// `min_stores_per_cluster` exist or the range is empty, and `Config`
    /// for zero size bounds.
    pub fn analyze(store_count: usize, constraints: &ConstraintConfig) -> Result<Self> {
        let min_stores = constraints.min_stores_per_cluster;
        let max_stores = constraints.max_stores_per_cluster;
        let target_stores = constraints.target_stores_per_cluster;

        if min_stores == 0 || max_stores == 0 || target_stores == 0 {
            return Err(ClusteringError::Config(
                "cluster size bounds must be at least 1".to_string(),
            ));
        }

        let min_clusters = store_count.div_ceil(max_stores);
        let max_clusters = store_count / min_stores;

        if store_count < min_stores || min_clusters > max_clusters {
            return Err(ClusteringError::ConfigurationInfeasible {
                store_count,
                min_stores,
                max_stores,
                min_clusters,
                max_clusters,
            });
        }

        // Integer round-half-up of store_count / target_stores.
        let rounded = (2 * store_count + target_stores) / (2 * target_stores);
        let optimal_clusters = rounded.clamp(min_clusters, max_clusters);

        Ok(Self {
            store_count,
            min_stores,
            max_stores,
            target_stores,
            min_clusters,
            max_clusters,
            optimal_clusters,
        })
    }

    /// Inclusive range of cluster counts that admit a valid partition.
    pub fn cluster_range(&self) -> RangeInclusive<usize> {
        self.min_clusters..=self.max_clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(n: usize, min: usize, max: usize, target: usize) -> Result<FeasibilityAnalysis> {
        FeasibilityAnalysis::analyze(n, &ConstraintConfig::with_sizes(min, max, target))
    }

    #[test]
    fn test_large_population() {
        let analysis = analyze(2264, 35, 50, 42).unwrap();
        assert_eq!(analysis.cluster_range(), 46..=64);
        assert_eq!(analysis.optimal_clusters, 54);
    }

    #[test]
    fn test_single_cluster_when_two_cannot_fit() {
        let analysis = analyze(46, 35, 50, 42).unwrap();
        assert_eq!(analysis.cluster_range(), 1..=1);
        assert_eq!(analysis.optimal_clusters, 1);
    }

    #[test]
    fn test_exactly_two_clusters() {
        let analysis = analyze(200, 100, 110, 105).unwrap();
        assert_eq!(analysis.cluster_range(), 2..=2);
        assert_eq!(analysis.optimal_clusters, 2);

        let tight = analyze(200, 100, 105, 100).unwrap();
        assert_eq!(tight.cluster_range(), 2..=2);
    }

    #[test]
    fn test_empty_range_is_infeasible() {
        let err = analyze(150, 100, 105, 100).unwrap_err();
        match err {
            ClusteringError::ConfigurationInfeasible {
                store_count,
                min_clusters,
                max_clusters,
                ..
            } => {
                assert_eq!(store_count, 150);
                assert_eq!(min_clusters, 2);
                assert_eq!(max_clusters, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fewer_stores_than_minimum_is_infeasible() {
        assert!(matches!(
            analyze(20, 35, 50, 42),
            Err(ClusteringError::ConfigurationInfeasible { .. })
        ));
        assert!(matches!(
            analyze(0, 1, 5, 3),
            Err(ClusteringError::ConfigurationInfeasible { .. })
        ));
    }

    #[test]
    fn test_optimal_is_clipped_into_range() {
        // round(100 / 10) = 10 but at most floor(100 / 30) = 3 clusters fit.
        let analysis = FeasibilityAnalysis::analyze(
            100,
            &ConstraintConfig {
                target_stores_per_cluster: 10,
                ..ConstraintConfig::with_sizes(30, 60, 30)
            },
        )
        .unwrap();
        assert_eq!(analysis.max_clusters, 3);
        assert_eq!(analysis.optimal_clusters, 3);
    }

    #[test]
    fn test_feasibility_matches_closed_form() {
        for n in 1..=300usize {
            for (min, max) in [(1, 1), (3, 5), (10, 12), (35, 50), (100, 105)] {
                let target = (min + max) / 2;
                let feasible = n >= min && n.div_ceil(max) <= n / min;
                let result = analyze(n, min, max, target);
                assert_eq!(result.is_ok(), feasible, "n={n} min={min} max={max}");
                if let Ok(analysis) = result {
                    assert!(analysis.cluster_range().contains(&analysis.optimal_clusters));
                }
            }
        }
    }
}
