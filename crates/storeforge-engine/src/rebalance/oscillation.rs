//! Back-and-forth move detection.

use std::collections::VecDeque;

use storeforge_core::ClusterId;

#[derive(Debug, Clone, Copy)]
struct Departure {
    iteration: u64,
    store_index: usize,
    cluster: ClusterId,
}

/// Remembers the clusters stores left during the last `window` iterations
/// and pins stores that return to one of them.
///
/// Pinned stores are excluded from candidate generation for the rest of
/// the run.
///
/// # Example
///
/// ```
/// use storeforge_engine::rebalance::OscillationDetector;
///
/// let mut detector = OscillationDetector::new(5, 10);
/// assert!(!detector.record_move(1, 3, 0, 1));
/// assert!(detector.record_move(2, 3, 1, 0));
/// assert!(detector.is_pinned(3));
/// ```
#[derive(Debug, Clone)]
pub struct OscillationDetector {
    window: u64,
    departures: VecDeque<Departure>,
    pinned: Vec<bool>,
}

impl OscillationDetector {
    /// # Panics
    ///
    /// Panics if `window` is 0.
    pub fn new(window: usize, store_count: usize) -> Self {
        assert!(window > 0, "oscillation window must be > 0, got 0");
        Self {
            window: window as u64,
            departures: VecDeque::with_capacity(window),
            pinned: vec![false; store_count],
        }
    }

    /// Records a move applied at `iteration` (1-based).
    ///
    /// Returns true if the move sent the store back into a cluster it left
    /// within the window; the store is pinned in that case.
    pub fn record_move(
        &mut self,
        iteration: u64,
        store_index: usize,
        from: ClusterId,
        to: ClusterId,
    ) -> bool {
        let returned = self.departures.iter().any(|d| {
            d.store_index == store_index
                && d.cluster == to
                && iteration.saturating_sub(d.iteration) <= self.window
        });
        if returned {
            self.pinned[store_index] = true;
        }

        // Departures this old cannot match any later iteration.
        while self
            .departures
            .front()
            .is_some_and(|d| iteration.saturating_sub(d.iteration) >= self.window)
        {
            self.departures.pop_front();
        }
        self.departures.push_back(Departure {
            iteration,
            store_index,
            cluster: from,
        });
        returned
    }

    pub fn is_pinned(&self, store_index: usize) -> bool {
        self.pinned[store_index]
    }

    /// Indices of pinned stores in ascending order.
    pub fn pinned_stores(&self) -> Vec<usize> {
        self.pinned
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| p.then_some(i))
            .collect()
    }
}
