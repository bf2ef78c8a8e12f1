//! Constraint validation of a partition.

use storeforge_config::ConstraintConfig;
use storeforge_core::{ClusterId, ClusteringState, Violation, ViolationKind};

/// Scans a partition for cardinality and covariate-range breaches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintValidator {
    min_stores: usize,
    max_stores: usize,
    max_covariate_range: f64,
}

impl ConstraintValidator {
    pub fn new(constraints: &ConstraintConfig) -> Self {
        Self {
            min_stores: constraints.min_stores_per_cluster,
            max_stores: constraints.max_stores_per_cluster,
            max_covariate_range: constraints.max_covariate_range,
        }
    }

    /// Returns every violation, ordered by cluster id then kind.
    ///
    /// An empty list means the partition is fully compliant.
    pub fn validate(&self, state: &ClusteringState) -> Vec<Violation> {
        let mut violations = Vec::new();
        for cluster in state.clusters() {
            self.collect(
                cluster.id(),
                cluster.size(),
                cluster.covariate_range(),
                &mut violations,
            );
        }
        violations
    }

    /// Violations of a single cluster with the given size and range.
    pub fn cluster_violations(&self, id: ClusterId, size: usize, range: f64) -> Vec<Violation> {
        let mut violations = Vec::new();
        self.collect(id, size, range, &mut violations);
        violations
    }

    /// Sum of violation magnitudes for a cluster with the given size and
    /// covariate range.
    pub fn cluster_magnitude(&self, size: usize, range: f64) -> f64 {
        let mut magnitude = 0.0;
        if size < self.min_stores {
            magnitude += (self.min_stores - size) as f64;
        } else if size > self.max_stores {
            magnitude += (size - self.max_stores) as f64;
        }
        if range > self.max_covariate_range {
            magnitude += range - self.max_covariate_range;
        }
        magnitude
    }

    /// Sum of all violation magnitudes of a partition.
    pub fn total_magnitude(&self, state: &ClusteringState) -> f64 {
        state
            .clusters()
            .iter()
            .map(|c| self.cluster_magnitude(c.size(), c.covariate_range()))
            .sum()
    }

    pub fn min_stores(&self) -> usize {
        self.min_stores
    }

    pub fn max_stores(&self) -> usize {
        self.max_stores
    }

    pub fn max_covariate_range(&self) -> f64 {
        self.max_covariate_range
    }

    fn collect(&self, id: ClusterId, size: usize, range: f64, out: &mut Vec<Violation>) {
        if size > self.max_stores {
            out.push(Violation::new(
                id,
                ViolationKind::SizeTooLarge,
                (size - self.max_stores) as f64,
            ));
        } else if size < self.min_stores {
            out.push(Violation::new(
                id,
                ViolationKind::SizeTooSmall,
                (self.min_stores - size) as f64,
            ));
        }
        if range > self.max_covariate_range {
            out.push(Violation::new(
                id,
                ViolationKind::CovariateRangeExceeded,
                range - self.max_covariate_range,
            ));
        }
    }
}

/// Sum of magnitudes of a violation list.
pub fn total_magnitude(violations: &[Violation]) -> f64 {
    violations.iter().map(|v| v.magnitude).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storeforge_core::Store;

    fn state(covariates: &[(usize, f64)], cluster_count: usize) -> ClusteringState {
        let stores = covariates
            .iter()
            .enumerate()
            .map(|(i, &(_, c))| Store::with_features(format!("s{i}"), vec![i as f64], c))
            .collect();
        let assignment = covariates.iter().map(|&(cluster, _)| cluster).collect();
        ClusteringState::from_assignment(stores, assignment, cluster_count).unwrap()
    }

    fn validator() -> ConstraintValidator {
        ConstraintValidator::new(
            &ConstraintConfig::with_sizes(2, 3, 2).with_max_covariate_range(2.0),
        )
    }

    #[test]
    fn test_compliant_partition_has_no_violations() {
        let state = state(&[(0, 10.0), (0, 11.0), (1, 20.0), (1, 22.0)], 2);
        assert!(validator().validate(&state).is_empty());
        assert_eq!(validator().total_magnitude(&state), 0.0);
    }

    #[test]
    fn test_reports_each_breached_bound() {
        let state = state(
            &[
                (0, 10.0),
                (0, 10.5),
                (0, 11.0),
                (0, 17.0),
                (1, 20.0),
            ],
            2,
        );
        let violations = validator().validate(&state);

        assert_eq!(
            violations,
            vec![
                Violation::new(0, ViolationKind::SizeTooLarge, 1.0),
                Violation::new(0, ViolationKind::CovariateRangeExceeded, 5.0),
                Violation::new(1, ViolationKind::SizeTooSmall, 1.0),
            ]
        );
        assert_eq!(total_magnitude(&violations), 7.0);
        assert_eq!(validator().total_magnitude(&state), 7.0);
    }

    #[test]
    fn test_range_at_limit_is_compliant() {
        let state = state(&[(0, 10.0), (0, 12.0)], 1);
        assert!(validator().validate(&state).is_empty());
    }

    #[test]
    fn test_cluster_magnitude_matches_violations() {
        let v = validator();
        for (size, range) in [(1, 0.0), (2, 2.5), (5, 9.0), (3, 1.0)] {
            let expected = total_magnitude(&v.cluster_violations(0, size, range));
            assert_eq!(v.cluster_magnitude(size, range), expected);
        }
    }
}
