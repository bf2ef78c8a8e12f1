//! Run output: per-store assignments, per-cluster profiles and the run
//! report.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use storeforge_config::ClusteringConfig;
use storeforge_core::{ClusterId, DataFlag, Violation};
use thiserror::Error;

use crate::blend::BlendReport;
use crate::feasibility::FeasibilityAnalysis;
use crate::kmeans::{BaseClusteringSummary, BasePartition};
use crate::rebalance::{AbortReason, FinalState, RebalanceOutcome, RepairStep};

/// Errors writing output files.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Final cluster of one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub store_id: String,
    pub cluster_id: ClusterId,
    /// Cluster from the base partition, before repair.
    pub initial_cluster_id: ClusterId,
    /// Number of repair moves that touched the store.
    pub move_count: u32,
    pub pinned: bool,
    pub data_flag: DataFlag,
}

/// Summary of one final cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub cluster_id: ClusterId,
    pub centroid: Vec<f64>,
    pub size: usize,
    pub covariate_min: f64,
    pub covariate_max: f64,
    pub covariate_range: f64,
    pub complete_count: usize,
    pub reference_missing_count: usize,
    pub run_timestamp: String,
}

/// Non-fatal conditions surfaced in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunWarning {
    /// A store clustered on recent-season features only.
    DataIncomplete { store_id: String },
    /// A store returned to a cluster it had recently left and was pinned.
    OscillationDetected {
        iteration: u64,
        store_id: String,
        cluster_id: ClusterId,
    },
    /// Repair stopped with violations left.
    RebalanceAborted {
        reason: AbortReason,
        unresolved: usize,
    },
}

/// Everything an auditor needs to reconstruct a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_timestamp: String,
    pub config: ClusteringConfig,
    pub feasibility: FeasibilityAnalysis,
    pub blend: BlendReport,
    pub base_clustering: BaseClusteringSummary,
    pub final_state: FinalState,
    pub abort_reason: Option<AbortReason>,
    pub iteration_count: u64,
    pub initial_violations: Vec<Violation>,
    pub unresolved_violations: Vec<Violation>,
    pub warnings: Vec<RunWarning>,
    pub trace: Vec<RepairStep>,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// True only when repair converged.
    pub fn is_compliant(&self) -> bool {
        self.final_state == FinalState::Converged
    }
}

/// Result of a clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringOutput {
    /// One record per store, in input order.
    pub assignments: Vec<AssignmentRecord>,
    /// One profile per cluster, by cluster id.
    pub profiles: Vec<ClusterProfile>,
    pub report: RunReport,
}

impl ClusteringOutput {
    pub fn cluster_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn cluster_of(&self, store_id: &str) -> Option<ClusterId> {
        self.assignments
            .iter()
            .find(|a| a.store_id == store_id)
            .map(|a| a.cluster_id)
    }

    pub fn to_json_pretty(&self) -> Result<String, OutputError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Assignments only. Carries no timestamp, so identical runs produce
    /// identical bytes.
    pub fn assignments_json(&self) -> Result<String, OutputError> {
        Ok(serde_json::to_string_pretty(&self.assignments)?)
    }

    /// Writes `assignments.json`, `clusters.json` and `report.json` into
    /// `dir`, creating it if needed.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<(), OutputError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        fs::write(dir.join("assignments.json"), self.assignments_json()?)?;
        fs::write(
            dir.join("clusters.json"),
            serde_json::to_string_pretty(&self.profiles)?,
        )?;
        fs::write(
            dir.join("report.json"),
            serde_json::to_string_pretty(&self.report)?,
        )?;
        Ok(())
    }
}

/// Inputs collected over a run, consumed by [`OutputGenerator::generate`].
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub config: ClusteringConfig,
    pub feasibility: FeasibilityAnalysis,
    pub blend: BlendReport,
    pub base: BasePartition,
    pub outcome: RebalanceOutcome,
    pub elapsed: Duration,
}

/// Builds [`ClusteringOutput`] from a completed run.
#[derive(Debug, Clone)]
pub struct OutputGenerator {
    timestamp: DateTime<Utc>,
}

impl OutputGenerator {
    /// Stamps output with the current UTC time.
    pub fn new() -> Self {
        Self::with_timestamp(Utc::now())
    }

    pub fn with_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp }
    }

    pub fn generate(&self, run: CompletedRun) -> ClusteringOutput {
        let run_timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let CompletedRun {
            config,
            feasibility,
            blend,
            base,
            outcome,
            elapsed,
        } = run;
        let state = &outcome.state;

        let move_counts = outcome.move_counts();
        let assignments = state
            .stores()
            .iter()
            .enumerate()
            .map(|(idx, store)| AssignmentRecord {
                store_id: store.id().to_string(),
                cluster_id: state.cluster_of(idx),
                initial_cluster_id: base.assignment[idx],
                move_count: move_counts[idx],
                pinned: outcome.pinned_stores.contains(&idx),
                data_flag: store.data_flag(),
            })
            .collect();

        let profiles = state
            .clusters()
            .iter()
            .map(|cluster| {
                let reference_missing_count = cluster
                    .members()
                    .filter(|&idx| state.store(idx).data_flag() == DataFlag::ReferenceMissing)
                    .count();
                ClusterProfile {
                    cluster_id: cluster.id(),
                    centroid: cluster.centroid().to_vec(),
                    size: cluster.size(),
                    covariate_min: cluster.covariate_min(),
                    covariate_max: cluster.covariate_max(),
                    covariate_range: cluster.covariate_range(),
                    complete_count: cluster.size() - reference_missing_count,
                    reference_missing_count,
                    run_timestamp: run_timestamp.clone(),
                }
            })
            .collect();

        let mut warnings: Vec<RunWarning> = blend
            .incomplete_store_ids
            .iter()
            .map(|id| RunWarning::DataIncomplete {
                store_id: id.clone(),
            })
            .collect();
        warnings.extend(outcome.oscillations.iter().map(|o| {
            RunWarning::OscillationDetected {
                iteration: o.iteration,
                store_id: o.store_id.clone(),
                cluster_id: o.cluster_id,
            }
        }));
        if let Some(reason) = outcome.abort_reason {
            warnings.push(RunWarning::RebalanceAborted {
                reason,
                unresolved: outcome.unresolved_violations.len(),
            });
        }

        let report = RunReport {
            run_timestamp,
            config,
            feasibility,
            blend,
            base_clustering: base.summary,
            final_state: outcome.final_state,
            abort_reason: outcome.abort_reason,
            iteration_count: outcome.iteration_count,
            initial_violations: outcome.initial_violations,
            unresolved_violations: outcome.unresolved_violations,
            warnings,
            trace: outcome.trace,
            elapsed_ms: elapsed.as_millis() as u64,
        };

        ClusteringOutput {
            assignments,
            profiles,
            report,
        }
    }
}

impl Default for OutputGenerator {
    fn default() -> Self {
        Self::new()
    }
}
