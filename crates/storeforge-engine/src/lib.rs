//! StoreForge Engine - constrained seasonal store clustering
//!
//! Partitions stores into groups that are homogeneous in blended seasonal
//! sales features while enforcing two hard constraints:
//! - every cluster holds between `min_stores_per_cluster` and
//!   `max_stores_per_cluster` stores
//! - the spread of the climate covariate inside a cluster stays within
//!   `max_covariate_range`
//!
//! A run goes through five stages:
//! 1. [`SeasonalFeatureBlender`] z-scores and blends recent and reference
//!    season features
//! 2. [`FeasibilityAnalysis`] derives the valid cluster-count range and the
//!    cluster count to seed with
//! 3. [`BaseClusterer`] builds an unconstrained k-means partition
//! 4. [`RebalancingEngine`] repairs violations one store move at a time
//! 5. [`OutputGenerator`] assembles assignments, profiles and the run report
//!
//! [`ClusteringEngine`] drives all five; [`run_batch`] runs independent
//! tables in parallel.

pub mod batch;
pub mod blend;
pub mod engine;
pub mod feasibility;
pub mod kmeans;
pub mod output;
pub mod rebalance;
pub mod validator;

pub use batch::{run_batch, ClusteringJob};
pub use blend::{BlendOutcome, BlendReport, NormalizationStats, SeasonalFeatureBlender};
pub use engine::ClusteringEngine;
pub use feasibility::FeasibilityAnalysis;
pub use kmeans::{BaseClusterer, BaseClusteringSummary, BasePartition};
pub use output::{
    AssignmentRecord, ClusterProfile, ClusteringOutput, CompletedRun, OutputError,
    OutputGenerator, RunReport, RunWarning,
};
pub use rebalance::{
    AbortReason, FinalState, RebalanceOutcome, RebalanceState, RebalancingEngine, RepairStep,
};
pub use validator::ConstraintValidator;
