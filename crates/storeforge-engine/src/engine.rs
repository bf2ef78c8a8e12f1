//! End-to-end clustering pipeline.

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use storeforge_config::ClusteringConfig;
use storeforge_core::{ClusteringState, Result, StoreRecord};
use tracing::{error, info};

use crate::blend::SeasonalFeatureBlender;
use crate::feasibility::FeasibilityAnalysis;
use crate::kmeans::BaseClusterer;
use crate::output::{ClusteringOutput, CompletedRun, OutputGenerator};
use crate::rebalance::RebalancingEngine;

/// Runs feasibility gate, blend, base clustering, repair and output for one
/// store table.
///
/// # Example
///
/// ```
/// use storeforge_config::{ClusteringConfig, ConstraintConfig};
/// use storeforge_core::StoreRecord;
/// use storeforge_engine::ClusteringEngine;
///
/// let records: Vec<StoreRecord> = (0..12)
///     .map(|i| {
///         let x = (i / 4) as f64 * 10.0 + (i % 4) as f64 * 0.1;
///         StoreRecord::new(format!("s{i}"), vec![x], Some(vec![x]), 20.0 + (i / 4) as f64)
///     })
///     .collect();
/// let config = ClusteringConfig::default()
///     .with_constraints(ConstraintConfig::with_sizes(3, 5, 4).with_max_covariate_range(2.0));
///
/// let output = ClusteringEngine::new(config).run(&records).unwrap();
///
/// assert_eq!(output.cluster_count(), 3);
/// assert!(output.report.is_compliant());
/// ```
#[derive(Debug, Clone)]
pub struct ClusteringEngine {
    config: ClusteringConfig,
}

impl ClusteringEngine {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Clusters `records`.
    ///
    /// An aborted repair still produces output; check
    /// [`RunReport::is_compliant`](crate::RunReport::is_compliant).
    ///
    /// # Errors
    ///
    /// * `Config` for invalid configuration values
    /// * `InvalidInput` for malformed store records
    /// * `ConfigurationInfeasible` when no cluster count satisfies the size
    ///   bounds
    pub fn run(&self, records: &[StoreRecord]) -> Result<ClusteringOutput> {
        let start = Instant::now();
        let config = &self.config;
        config.validate()?;

        info!(
            event = "run_start",
            stores = records.len(),
            min_stores = config.constraints.min_stores_per_cluster,
            max_stores = config.constraints.max_stores_per_cluster,
            max_covariate_range = config.constraints.max_covariate_range,
            seed = config.random_seed,
        );

        let feasibility = FeasibilityAnalysis::analyze(records.len(), &config.constraints)
            .inspect_err(|e| error!(event = "configuration_infeasible", error = %e))?;
        let cluster_count = feasibility.optimal_clusters;
        info!(
            event = "feasibility",
            min_clusters = feasibility.min_clusters,
            max_clusters = feasibility.max_clusters,
            clusters = cluster_count,
        );

        let blended = SeasonalFeatureBlender::from_constraints(&config.constraints).blend(records)?;

        let phase_start = Instant::now();
        info!(event = "phase_start", phase = "base_clustering", clusters = cluster_count);
        let mut rng = ChaCha8Rng::seed_from_u64(config.random_seed);
        let base = BaseClusterer::new(cluster_count, &config.base_clustering)
            .partition(&blended.stores, &mut rng)?;
        info!(
            event = "phase_end",
            phase = "base_clustering",
            duration_ms = phase_start.elapsed().as_millis() as u64,
            inertia = base.summary.inertia,
            restarts = base.summary.restarts,
        );

        let state =
            ClusteringState::from_assignment(blended.stores, base.assignment.clone(), cluster_count)?;
        let outcome =
            RebalancingEngine::from_config(config, cluster_count, records.len()).rebalance(state);
        outcome.state.check_invariants()?;

        let elapsed = start.elapsed();
        info!(
            event = "run_end",
            final_state = %outcome.final_state,
            clusters = cluster_count,
            moves = outcome.iteration_count,
            unresolved = outcome.unresolved_violations.len(),
            duration_ms = elapsed.as_millis() as u64,
        );

        Ok(OutputGenerator::new().generate(CompletedRun {
            config: config.clone(),
            feasibility,
            blend: blended.report,
            base,
            outcome,
            elapsed,
        }))
    }
}
