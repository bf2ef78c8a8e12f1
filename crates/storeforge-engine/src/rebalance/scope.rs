//! Repair-loop scope.

use std::time::{Duration, Instant};

use storeforge_core::ClusteringState;

/// Owns the working [`ClusteringState`] for the duration of a repair run,
/// together with the move counter and start time that terminations read.
#[derive(Debug)]
pub struct RebalanceScope {
    state: ClusteringState,
    start_time: Option<Instant>,
    iteration_count: u64,
}

impl RebalanceScope {
    pub fn new(state: ClusteringState) -> Self {
        Self {
            state,
            start_time: None,
            iteration_count: 0,
        }
    }

    pub fn start_solving(&mut self) {
        self.start_time = Some(Instant::now());
        self.iteration_count = 0;
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|t| t.elapsed())
    }

    pub fn state(&self) -> &ClusteringState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ClusteringState {
        &mut self.state
    }

    pub fn increment_iteration_count(&mut self) -> u64 {
        self.iteration_count += 1;
        self.iteration_count
    }

    /// Number of moves applied so far.
    pub fn iteration_count(&self) -> u64 {
        self.iteration_count
    }

    pub fn into_state(self) -> ClusteringState {
        self.state
    }
}
