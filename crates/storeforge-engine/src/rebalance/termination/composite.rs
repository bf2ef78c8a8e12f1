//! Composite termination (OR).
//!
//! Uses macro-generated tuple implementations for zero type erasure.

use super::Termination;
use crate::rebalance::{AbortReason, RebalanceScope};

/// Combines multiple terminations with OR logic (any must terminate).
///
/// Wraps a tuple of terminations. The reason reported is the one of the
/// first child, in tuple order, that fires.
///
/// # Examples
///
/// ```
/// use storeforge_engine::rebalance::{IterationBudgetTermination, OrTermination, TimeTermination};
///
/// // Terminate after 30 seconds OR 1000 moves
/// let termination = OrTermination::new((
///     IterationBudgetTermination::new(1000),
///     TimeTermination::seconds(30),
/// ));
/// ```
#[derive(Debug)]
pub struct OrTermination<T>(pub T);

impl<T> OrTermination<T> {
    /// Creates a new OR termination from a tuple of terminations.
    pub fn new(terminations: T) -> Self {
        Self(terminations)
    }
}

/// Generates `Termination` implementations for OR tuples.
macro_rules! impl_or_termination {
    ($($idx:tt: $T:ident),+) => {
        impl<$($T),+> Termination for OrTermination<($($T,)+)>
        where
            $($T: Termination,)+
        {
            fn check(&self, scope: &RebalanceScope) -> Option<AbortReason> {
                None$(.or_else(|| (self.0).$idx.check(scope)))+
            }
        }
    };
}

impl_or_termination!(0: T0);
impl_or_termination!(0: T0, 1: T1);
impl_or_termination!(0: T0, 1: T1, 2: T2);
impl_or_termination!(0: T0, 1: T1, 2: T2, 3: T3);
