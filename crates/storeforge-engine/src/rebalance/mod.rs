//! Constraint repair of a base partition.
//!
//! The repair loop is an explicit state machine:
//!
//! ```text
//! Scanning -> Repairing -> Scanning -> ... -> Converged
//!                                       \--> Aborted(reason)
//! ```
//!
//! Each `Repairing` step moves exactly one store. A move is only applied if
//! the acceptor agrees, so with [`NonWorseningAcceptor`] the total violation
//! magnitude never increases from one step to the next.

mod acceptor;
mod candidate;
mod oscillation;
mod phase;
mod scope;
pub mod termination;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storeforge_core::{ClusterId, ClusteringState, Violation, ViolationKind};

pub use acceptor::{Acceptor, NonWorseningAcceptor};
pub use candidate::RepairMove;
pub use oscillation::OscillationDetector;
pub use phase::{DefaultTermination, RebalancingEngine};
pub use scope::RebalanceScope;
pub use termination::{IterationBudgetTermination, OrTermination, Termination, TimeTermination};

/// Why a repair run stopped before reaching compliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    IterationBudgetExhausted,
    TimeLimitExceeded,
    /// No violation had an acceptable candidate move.
    Stalled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IterationBudgetExhausted => write!(f, "iteration budget exhausted"),
            Self::TimeLimitExceeded => write!(f, "time limit exceeded"),
            Self::Stalled => write!(f, "no acceptable repair move"),
        }
    }
}

/// State of the repair state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceState {
    Scanning,
    Repairing,
    Converged,
    Aborted(AbortReason),
}

impl RebalanceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converged | Self::Aborted(_))
    }
}

/// Terminal state as it appears in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalState {
    Converged,
    Aborted,
}

impl fmt::Display for FinalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converged => write!(f, "CONVERGED"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// One applied move in the repair trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairStep {
    /// 1-based move counter.
    pub iteration: u64,
    pub store_id: String,
    pub from_cluster: ClusterId,
    pub to_cluster: ClusterId,
    /// Cluster whose violation the move targeted.
    pub violation_cluster: ClusterId,
    pub repaired: ViolationKind,
    /// Total violation magnitude before the move.
    pub magnitude_before: f64,
    /// Total violation magnitude after the move.
    pub magnitude_after: f64,
    /// Whether this move pinned the store.
    pub pinned: bool,
}

/// A store that returned to a cluster it had recently left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OscillationEvent {
    pub iteration: u64,
    pub store_id: String,
    pub cluster_id: ClusterId,
}

/// Result of a repair run.
#[derive(Debug, Clone)]
pub struct RebalanceOutcome {
    /// The repaired (or partially repaired) partition.
    pub state: ClusteringState,
    pub final_state: FinalState,
    pub abort_reason: Option<AbortReason>,
    /// Number of moves applied.
    pub iteration_count: u64,
    /// Violations of the partition before any move.
    pub initial_violations: Vec<Violation>,
    /// Violations left at termination. Empty when converged.
    pub unresolved_violations: Vec<Violation>,
    pub trace: Vec<RepairStep>,
    pub oscillations: Vec<OscillationEvent>,
    /// Indices of stores pinned by oscillation detection.
    pub pinned_stores: Vec<usize>,
    pub elapsed: Duration,
}

impl RebalanceOutcome {
    pub fn is_converged(&self) -> bool {
        self.final_state == FinalState::Converged
    }

    /// Number of moves that touched each store, indexed like the stores.
    pub fn move_counts(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.state.store_count()];
        let index: std::collections::HashMap<&str, usize> = self
            .state
            .stores()
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id(), i))
            .collect();
        for step in &self.trace {
            if let Some(&i) = index.get(step.store_id.as_str()) {
                counts[i] += 1;
            }
        }
        counts
    }
}
