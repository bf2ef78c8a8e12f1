//! The repair loop.

use std::cmp::Ordering;

use storeforge_config::ClusteringConfig;
use storeforge_core::{ClusteringState, Violation};
use tracing::{debug, info, trace, warn};

use super::candidate::{candidate_moves, RepairMove};
use super::{
    AbortReason, Acceptor, FinalState, IterationBudgetTermination, NonWorseningAcceptor,
    OrTermination, OscillationDetector, OscillationEvent, RebalanceOutcome, RebalanceScope,
    RebalanceState, RepairStep, Termination, TimeTermination,
};
use crate::validator::{total_magnitude, ConstraintValidator};

/// Move budget, optionally raced against a wall-clock watchdog.
pub type DefaultTermination =
    OrTermination<(IterationBudgetTermination, Option<TimeTermination>)>;

/// Repairs a partition one store move at a time until every cluster
/// satisfies its bounds or a termination condition fires.
///
/// # Type Parameters
/// * `A` - The acceptor deciding which candidate moves may be applied
/// * `T` - The termination condition
#[derive(Debug)]
pub struct RebalancingEngine<A = NonWorseningAcceptor, T = DefaultTermination> {
    validator: ConstraintValidator,
    target_size: usize,
    acceptor: A,
    termination: T,
    oscillation_window: usize,
}

impl<A, T> RebalancingEngine<A, T>
where
    A: Acceptor,
    T: Termination,
{
    /// # Panics
    ///
    /// Panics if `oscillation_window` is 0.
    pub fn new(
        validator: ConstraintValidator,
        target_size: usize,
        acceptor: A,
        termination: T,
        oscillation_window: usize,
    ) -> Self {
        assert!(oscillation_window > 0, "oscillation_window must be > 0");
        Self {
            validator,
            target_size,
            acceptor,
            termination,
            oscillation_window,
        }
    }

    pub fn validator(&self) -> &ConstraintValidator {
        &self.validator
    }

    /// Runs the state machine to a terminal state.
    pub fn rebalance(&mut self, state: ClusteringState) -> RebalanceOutcome {
        let store_count = state.store_count();
        let cluster_count = state.cluster_count();
        let mut scope = RebalanceScope::new(state);
        scope.start_solving();

        let initial_violations = self.validator.validate(scope.state());
        let mut violations = initial_violations.clone();
        let mut magnitude = total_magnitude(&violations);
        let mut detector = OscillationDetector::new(self.oscillation_window, store_count);
        let mut trace_steps = Vec::new();
        let mut oscillations = Vec::new();

        info!(
            event = "phase_start",
            phase = "rebalance",
            clusters = cluster_count,
            stores = store_count,
            violations = violations.len(),
            magnitude = magnitude,
        );
        self.acceptor.phase_started(magnitude);

        let mut machine = RebalanceState::Scanning;
        while !machine.is_terminal() {
            machine = match machine {
                RebalanceState::Scanning => {
                    violations = self.validator.validate(scope.state());
                    magnitude = total_magnitude(&violations);
                    if violations.is_empty() {
                        RebalanceState::Converged
                    } else if let Some(reason) = self.termination.check(&scope) {
                        RebalanceState::Aborted(reason)
                    } else {
                        RebalanceState::Repairing
                    }
                }
                RebalanceState::Repairing => {
                    match self.select_move(scope.state(), &violations, magnitude, &detector) {
                        None => RebalanceState::Aborted(AbortReason::Stalled),
                        Some(mv) => {
                            let step = self.apply(&mut scope, mv, magnitude, &mut detector);
                            if step.pinned {
                                warn!(
                                    event = "oscillation_detected",
                                    iteration = step.iteration,
                                    store = %step.store_id,
                                    cluster = step.to_cluster,
                                );
                                oscillations.push(OscillationEvent {
                                    iteration: step.iteration,
                                    store_id: step.store_id.clone(),
                                    cluster_id: step.to_cluster,
                                });
                            }
                            trace_steps.push(step);
                            RebalanceState::Scanning
                        }
                    }
                }
                terminal => terminal,
            };
        }

        let elapsed = scope.elapsed().unwrap_or_default();
        let iteration_count = scope.iteration_count();
        let (final_state, abort_reason) = match machine {
            RebalanceState::Aborted(reason) => {
                warn!(
                    event = "rebalance_aborted",
                    reason = %reason,
                    iterations = iteration_count,
                    unresolved = violations.len(),
                    magnitude = magnitude,
                );
                (FinalState::Aborted, Some(reason))
            }
            _ => (FinalState::Converged, None),
        };

        info!(
            event = "phase_end",
            phase = "rebalance",
            duration_ms = elapsed.as_millis() as u64,
            steps = iteration_count,
            final_state = %final_state,
            unresolved = violations.len(),
        );

        RebalanceOutcome {
            state: scope.into_state(),
            final_state,
            abort_reason,
            iteration_count,
            initial_violations,
            unresolved_violations: violations,
            trace: trace_steps,
            oscillations,
            pinned_stores: detector.pinned_stores(),
            elapsed,
        }
    }

    /// First acceptable candidate of the most severe violation that has
    /// one.
    fn select_move(
        &self,
        state: &ClusteringState,
        violations: &[Violation],
        magnitude: f64,
        detector: &OscillationDetector,
    ) -> Option<RepairMove> {
        let mut ordered: Vec<&Violation> = violations.iter().collect();
        ordered.sort_by(|a, b| severity_order(a, b));

        for violation in ordered {
            let candidates =
                candidate_moves(state, &self.validator, self.target_size, violation, detector);
            for mv in candidates {
                let score = mv.evaluate(state, &self.validator, magnitude);
                let accepted = self.acceptor.is_accepted(magnitude, score);
                trace!(
                    event = "candidate",
                    store = mv.store_index,
                    from = mv.from,
                    to = mv.to,
                    score = score,
                    accepted = accepted,
                );
                if accepted {
                    return Some(mv);
                }
            }
        }
        None
    }

    fn apply(
        &mut self,
        scope: &mut RebalanceScope,
        mv: RepairMove,
        magnitude_before: f64,
        detector: &mut OscillationDetector,
    ) -> RepairStep {
        scope.state_mut().move_store(mv.store_index, mv.to);
        let iteration = scope.increment_iteration_count();
        let pinned = detector.record_move(iteration, mv.store_index, mv.from, mv.to);
        let magnitude_after = self.validator.total_magnitude(scope.state());
        self.acceptor.step_ended(magnitude_after);

        let store_id = scope.state().store(mv.store_index).id().to_string();
        debug!(
            event = "step",
            step = iteration,
            store = %store_id,
            from = mv.from,
            to = mv.to,
            repaired = %mv.repaired,
            magnitude = magnitude_after,
        );

        RepairStep {
            iteration,
            store_id,
            from_cluster: mv.from,
            to_cluster: mv.to,
            violation_cluster: mv.violation_cluster,
            repaired: mv.repaired,
            magnitude_before,
            magnitude_after,
            pinned,
        }
    }
}

impl RebalancingEngine<NonWorseningAcceptor, DefaultTermination> {
    /// Builds the default engine for a partition of `store_count` stores
    /// into `cluster_count` clusters.
    pub fn from_config(config: &ClusteringConfig, cluster_count: usize, store_count: usize) -> Self {
        let budget = config
            .rebalance
            .iteration_budget_for(cluster_count, store_count);
        let termination = OrTermination::new((
            IterationBudgetTermination::new(budget),
            config.rebalance.time_limit().map(TimeTermination::new),
        ));
        Self::new(
            ConstraintValidator::new(&config.constraints),
            config.constraints.target_stores_per_cluster,
            NonWorseningAcceptor::new(),
            termination,
            config.rebalance.oscillation_window,
        )
    }
}

/// Magnitude descending, then kind order, then lowest cluster id.
pub(super) fn severity_order(a: &Violation, b: &Violation) -> Ordering {
    b.magnitude
        .total_cmp(&a.magnitude)
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.cluster_id.cmp(&b.cluster_id))
}
