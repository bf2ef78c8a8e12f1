//! Move-count budget.

use super::Termination;
use crate::rebalance::{AbortReason, RebalanceScope};

/// Terminates after a number of applied moves.
///
/// # Example
///
/// ```
/// use storeforge_engine::rebalance::IterationBudgetTermination;
///
/// // Stop after 540 moves
/// let term = IterationBudgetTermination::new(540);
/// assert_eq!(term.limit(), 540);
/// ```
#[derive(Debug, Clone)]
pub struct IterationBudgetTermination {
    limit: u64,
}

impl IterationBudgetTermination {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

impl Termination for IterationBudgetTermination {
    fn check(&self, scope: &RebalanceScope) -> Option<AbortReason> {
        (scope.iteration_count() >= self.limit).then_some(AbortReason::IterationBudgetExhausted)
    }
}
