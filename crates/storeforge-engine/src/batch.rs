//! Independent runs on the rayon pool.

use rayon::prelude::*;
use storeforge_config::ClusteringConfig;
use storeforge_core::{Result, StoreRecord};
use tracing::info;

use crate::engine::ClusteringEngine;
use crate::output::ClusteringOutput;

/// One store table clustered with its own configuration, e.g. one region.
#[derive(Debug, Clone)]
pub struct ClusteringJob {
    pub name: String,
    pub records: Vec<StoreRecord>,
    pub config: ClusteringConfig,
}

impl ClusteringJob {
    pub fn new(name: impl Into<String>, records: Vec<StoreRecord>, config: ClusteringConfig) -> Self {
        Self {
            name: name.into(),
            records,
            config,
        }
    }
}

/// Runs every job in parallel. Results are in job order.
///
/// Jobs share no mutable state; each run stays single-threaded and
/// deterministic for its seed.
pub fn run_batch(jobs: &[ClusteringJob]) -> Vec<Result<ClusteringOutput>> {
    info!(event = "batch_start", jobs = jobs.len());
    let results: Vec<_> = jobs
        .par_iter()
        .map(|job| {
            let _span = tracing::info_span!("job", name = %job.name).entered();
            ClusteringEngine::new(job.config.clone()).run(&job.records)
        })
        .collect();
    info!(
        event = "batch_end",
        jobs = jobs.len(),
        failed = results.iter().filter(|r| r.is_err()).count(),
    );
    results
}

#[cfg(test)]
mod tests {
    use storeforge_config::ConstraintConfig;
    use storeforge_core::ClusteringError;

    use super::*;

    fn region(offset: f64) -> Vec<StoreRecord> {
        (0..8)
            .map(|i| {
                let x = offset + (i / 4) as f64 * 10.0 + (i % 4) as f64 * 0.1;
                StoreRecord::new(format!("r{offset}-{i}"), vec![x], Some(vec![x]), 15.0)
            })
            .collect()
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let config = ClusteringConfig::default()
            .with_constraints(ConstraintConfig::with_sizes(3, 5, 4));
        let jobs = vec![
            ClusteringJob::new("north", region(0.0), config.clone()),
            ClusteringJob::new("south", region(100.0), config.clone().with_random_seed(3)),
        ];

        let results = run_batch(&jobs);

        assert_eq!(results.len(), 2);
        for (job, result) in jobs.iter().zip(&results) {
            let batch = result.as_ref().unwrap();
            let single = ClusteringEngine::new(job.config.clone())
                .run(&job.records)
                .unwrap();
            assert_eq!(batch.assignments, single.assignments);
        }
    }

    #[test]
    fn test_failing_job_does_not_affect_others() {
        let config = ClusteringConfig::default()
            .with_constraints(ConstraintConfig::with_sizes(3, 5, 4));
        let jobs = vec![
            ClusteringJob::new("ok", region(0.0), config),
            ClusteringJob::new("too-small", region(0.0), ClusteringConfig::default()),
        ];

        let results = run_batch(&jobs);

        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ClusteringError::ConfigurationInfeasible { .. })
        ));
    }
}
