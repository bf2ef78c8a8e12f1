//! Termination conditions for the repair loop.
//!
//! Both conditions are soft: the loop stops, the run still produces output,
//! and the report is marked aborted with the residual violations.

mod composite;
mod iteration_budget;
mod time;

use std::fmt::Debug;

use super::{AbortReason, RebalanceScope};

pub use composite::OrTermination;
pub use iteration_budget::IterationBudgetTermination;
pub use time::TimeTermination;

/// Trait for determining when to stop repairing.
pub trait Termination: Send + Debug {
    /// Returns why the loop must stop, or `None` to keep going.
    fn check(&self, scope: &RebalanceScope) -> Option<AbortReason>;

    /// Returns true if repairing should terminate.
    fn is_terminated(&self, scope: &RebalanceScope) -> bool {
        self.check(scope).is_some()
    }
}

/// An absent condition never terminates.
impl<T: Termination> Termination for Option<T> {
    fn check(&self, scope: &RebalanceScope) -> Option<AbortReason> {
        self.as_ref().and_then(|t| t.check(scope))
    }
}
