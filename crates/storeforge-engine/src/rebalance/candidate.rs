//! Candidate repair moves.

use std::cmp::Ordering;

use storeforge_core::{ClusterId, ClusteringState, Violation, ViolationKind};

use super::OscillationDetector;
use crate::validator::ConstraintValidator;

/// Moves one store from `from` to `to` to address a violation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairMove {
    pub store_index: usize,
    pub from: ClusterId,
    pub to: ClusterId,
    pub repaired: ViolationKind,
    pub violation_cluster: ClusterId,
}

impl RepairMove {
    /// Total violation magnitude the partition would have after this move.
    ///
    /// Only the two touched clusters change, so their contribution is
    /// swapped out of `total_before`.
    pub fn evaluate(
        &self,
        state: &ClusteringState,
        validator: &ConstraintValidator,
        total_before: f64,
    ) -> f64 {
        let from = state.cluster(self.from);
        let to = state.cluster(self.to);
        let before = validator.cluster_magnitude(from.size(), from.covariate_range())
            + validator.cluster_magnitude(to.size(), to.covariate_range());
        let after = validator.cluster_magnitude(
            from.size() - 1,
            state.covariate_range_without(self.from, self.store_index),
        ) + validator.cluster_magnitude(
            to.size() + 1,
            state.covariate_range_with(self.to, self.store_index),
        );
        (total_before - before + after).max(0.0)
    }
}

/// A move with its preference key. Lower keys are tried first, compared
/// lexicographically; ties go to the lowest cluster then store index.
struct Ranked {
    key: [f64; 3],
    mv: RepairMove,
}

impl Ranked {
    fn preference(&self, other: &Self) -> Ordering {
        self.key
            .iter()
            .zip(&other.key)
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.mv.to.cmp(&other.mv.to))
            .then_with(|| self.mv.from.cmp(&other.mv.from))
            .then_with(|| self.mv.store_index.cmp(&other.mv.store_index))
    }
}

/// Candidate moves addressing `violation`, in preference order.
///
/// Pinned stores are never proposed, and no move empties its source
/// cluster.
pub fn candidate_moves(
    state: &ClusteringState,
    validator: &ConstraintValidator,
    target_size: usize,
    violation: &Violation,
    oscillation: &OscillationDetector,
) -> Vec<RepairMove> {
    let mut ranked = match violation.kind {
        ViolationKind::SizeTooLarge => oversized(state, validator, violation, oscillation),
        ViolationKind::SizeTooSmall => {
            undersized(state, validator, target_size, violation, oscillation)
        }
        ViolationKind::CovariateRangeExceeded => {
            spread(state, validator, violation, oscillation)
        }
    };
    ranked.sort_by(Ranked::preference);
    ranked.into_iter().map(|r| r.mv).collect()
}

/// Sort key for descending order. `0.0 - x` keeps zero positive, so
/// `total_cmp` does not split `0.0` and `-0.0`.
fn descending(x: f64) -> f64 {
    0.0 - x
}

fn movable(
    state: &ClusteringState,
    cluster: ClusterId,
    oscillation: &OscillationDetector,
) -> Vec<usize> {
    if state.cluster(cluster).size() <= 1 {
        return Vec::new();
    }
    state
        .cluster(cluster)
        .members()
        .filter(|&idx| !oscillation.is_pinned(idx))
        .collect()
}

/// Members leave towards clusters with spare capacity, undersized ones
/// first. Members whose removal shrinks the covariate range most go first,
/// then the ones closest to the receiving centroid.
fn oversized(
    state: &ClusteringState,
    validator: &ConstraintValidator,
    violation: &Violation,
    oscillation: &OscillationDetector,
) -> Vec<Ranked> {
    let source = violation.cluster_id;
    let range = state.cluster(source).covariate_range();
    let members: Vec<(usize, f64)> = movable(state, source, oscillation)
        .into_iter()
        .map(|idx| (idx, range - state.covariate_range_without(source, idx)))
        .collect();
    let mut ranked = Vec::new();

    for target in state.clusters() {
        if target.id() == source || target.size() >= validator.max_stores() {
            continue;
        }
        let tier = if target.size() < validator.min_stores() { 0.0 } else { 1.0 };
        for &(idx, reduction) in &members {
            ranked.push(Ranked {
                key: [
                    tier,
                    descending(reduction),
                    state.distance_to_centroid(idx, target.id()),
                ],
                mv: RepairMove {
                    store_index: idx,
                    from: source,
                    to: target.id(),
                    repaired: violation.kind,
                    violation_cluster: source,
                },
            });
        }
    }
    ranked
}

/// Stores are pulled from donors that stay within bounds, nearest to the
/// deficient centroid first. Donors at or above target size are preferred;
/// any donor above the minimum is the fallback.
fn undersized(
    state: &ClusteringState,
    validator: &ConstraintValidator,
    target_size: usize,
    violation: &Violation,
    oscillation: &OscillationDetector,
) -> Vec<Ranked> {
    let deficient = violation.cluster_id;
    let mut ranked = Vec::new();

    for donor in state.clusters() {
        if donor.id() == deficient || donor.size() <= validator.min_stores() {
            continue;
        }
        let tier = if donor.size() >= target_size { 0.0 } else { 1.0 };
        for idx in movable(state, donor.id(), oscillation) {
            ranked.push(Ranked {
                key: [tier, state.distance_to_centroid(idx, deficient), 0.0],
                mv: RepairMove {
                    store_index: idx,
                    from: donor.id(),
                    to: deficient,
                    repaired: violation.kind,
                    violation_cluster: deficient,
                },
            });
        }
    }
    ranked
}

/// Covariate outliers (furthest from the cluster median) leave first,
/// towards clusters with spare capacity whose range would stay within the
/// limit, then towards the nearest centroid.
///
/// A source at the minimum size cannot lose a store without a size
/// violation, so it is also offered fills: stores inside its current band,
/// pulled from donors above the minimum. These rank after every eviction.
fn spread(
    state: &ClusteringState,
    validator: &ConstraintValidator,
    violation: &Violation,
    oscillation: &OscillationDetector,
) -> Vec<Ranked> {
    let source = violation.cluster_id;
    let Some(median) = state.covariate_median(source) else {
        return Vec::new();
    };
    let members: Vec<(usize, f64)> = movable(state, source, oscillation)
        .into_iter()
        .map(|idx| (idx, (state.store(idx).covariate() - median).abs()))
        .collect();
    let mut ranked = Vec::new();

    for target in state.clusters() {
        if target.id() == source || target.size() >= validator.max_stores() {
            continue;
        }
        for &(idx, deviation) in &members {
            let fits = state.covariate_range_with(target.id(), idx)
                <= validator.max_covariate_range();
            ranked.push(Ranked {
                key: [
                    descending(deviation),
                    if fits { 0.0 } else { 1.0 },
                    state.distance_to_centroid(idx, target.id()),
                ],
                mv: RepairMove {
                    store_index: idx,
                    from: source,
                    to: target.id(),
                    repaired: violation.kind,
                    violation_cluster: source,
                },
            });
        }
    }

    ranked.extend(fills(state, validator, violation, oscillation));
    ranked
}

fn fills(
    state: &ClusteringState,
    validator: &ConstraintValidator,
    violation: &Violation,
    oscillation: &OscillationDetector,
) -> Vec<Ranked> {
    let source = state.cluster(violation.cluster_id);
    if source.size() > validator.min_stores() || source.size() >= validator.max_stores() {
        return Vec::new();
    }
    let band = source.covariate_min()..=source.covariate_max();
    let mut ranked = Vec::new();

    for donor in state.clusters() {
        if donor.id() == source.id() || donor.size() <= validator.min_stores() {
            continue;
        }
        for idx in movable(state, donor.id(), oscillation) {
            if !band.contains(&state.store(idx).covariate()) {
                continue;
            }
            ranked.push(Ranked {
                key: [1.0, state.distance_to_centroid(idx, source.id()), 0.0],
                mv: RepairMove {
                    store_index: idx,
                    from: donor.id(),
                    to: source.id(),
                    repaired: violation.kind,
                    violation_cluster: source.id(),
                },
            });
        }
    }
    ranked
}
