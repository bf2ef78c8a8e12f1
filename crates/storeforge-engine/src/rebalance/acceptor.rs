//! Move acceptance.

use std::fmt::Debug;

/// Decides whether a candidate move is applied, given the total violation
/// magnitude before the move and the magnitude the move would produce.
pub trait Acceptor: Send + Debug {
    /// Returns true if a move resulting in `move_score` should be applied.
    fn is_accepted(&self, last_step_score: f64, move_score: f64) -> bool;

    /// Called when the repair loop starts.
    fn phase_started(&mut self, _initial_score: f64) {}

    /// Called after a move has been applied.
    fn step_ended(&mut self, _step_score: f64) {}
}

/// Accepts any move that does not increase the total violation magnitude.
///
/// Keeps the magnitude trace non-increasing, which is what makes repair
/// progress auditable. Plateau moves are allowed; oscillation detection
/// and the iteration budget bound them.
///
/// # Example
///
/// ```
/// use storeforge_engine::rebalance::{Acceptor, NonWorseningAcceptor};
///
/// let acceptor = NonWorseningAcceptor::new();
/// assert!(acceptor.is_accepted(3.0, 2.0));
/// assert!(acceptor.is_accepted(3.0, 3.0));
/// assert!(!acceptor.is_accepted(3.0, 3.5));
/// ```
#[derive(Debug, Clone)]
pub struct NonWorseningAcceptor {
    tolerance: f64,
}

impl NonWorseningAcceptor {
    /// Absorbs rounding in incremental magnitude updates.
    pub const DEFAULT_TOLERANCE: f64 = 1e-9;

    pub fn new() -> Self {
        Self::with_tolerance(Self::DEFAULT_TOLERANCE)
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for NonWorseningAcceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Acceptor for NonWorseningAcceptor {
    fn is_accepted(&self, last_step_score: f64, move_score: f64) -> bool {
        move_score <= last_step_score + self.tolerance
    }
}
