//! Unconstrained base partition: Lloyd's algorithm with k-means++ seeding.
//!
//! Ignores both hard constraints. Its only job is a low-variance starting
//! partition for the rebalancing engine.

use rand::Rng;
use serde::{Deserialize, Serialize};
use storeforge_config::BaseClusteringConfig;
use storeforge_core::{squared_euclidean, ClusterId, ClusteringError, Result, Store};
use tracing::{debug, trace};

/// Lowest-inertia partition found over all restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct BasePartition {
    /// Store index → cluster id.
    pub assignment: Vec<ClusterId>,
    pub cluster_count: usize,
    pub summary: BaseClusteringSummary,
}

/// Summary of the winning restart, copied into the run report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseClusteringSummary {
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
    /// Relocation rounds of the winning restart.
    pub iterations: usize,
    /// 0-based index of the winning restart.
    pub restart: usize,
    pub restarts: usize,
}

/// Multi-restart k-means over blended store features.
#[derive(Debug, Clone)]
pub struct BaseClusterer {
    cluster_count: usize,
    n_init: usize,
    max_iterations: usize,
}

impl BaseClusterer {
    pub fn new(cluster_count: usize, config: &BaseClusteringConfig) -> Self {
        Self {
            cluster_count,
            n_init: config.n_init.max(1),
            max_iterations: config.max_iterations.max(1),
        }
    }

    /// Partitions `stores` into exactly `cluster_count` non-empty clusters.
    ///
    /// All randomness is drawn from `rng`, so a seeded generator makes the
    /// result reproducible.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if `cluster_count` is 0 or exceeds the store count.
    pub fn partition<R: Rng>(&self, stores: &[Store], rng: &mut R) -> Result<BasePartition> {
        let k = self.cluster_count;
        if k == 0 || k > stores.len() {
            return Err(ClusteringError::Internal(format!(
                "cannot split {} stores into {} clusters",
                stores.len(),
                k
            )));
        }
        let points: Vec<&[f64]> = stores.iter().map(Store::features).collect();

        let mut best: Option<(Vec<ClusterId>, BaseClusteringSummary)> = None;
        for restart in 0..self.n_init {
            let run = lloyd(&points, k, self.max_iterations, rng);
            trace!(
                event = "restart_end",
                restart = restart as u64,
                inertia = run.inertia,
                iterations = run.iterations as u64,
            );
            let improves = best
                .as_ref()
                .map_or(true, |(_, summary)| run.inertia < summary.inertia);
            if improves {
                best = Some((
                    run.assignment,
                    BaseClusteringSummary {
                        inertia: run.inertia,
                        iterations: run.iterations,
                        restart,
                        restarts: self.n_init,
                    },
                ));
            }
        }

        let (assignment, summary) = best.ok_or_else(|| {
            ClusteringError::Internal("base clustering ran no restarts".to_string())
        })?;
        debug!(
            event = "base_partition",
            clusters = k as u64,
            inertia = summary.inertia,
            restart = summary.restart as u64,
        );
        Ok(BasePartition {
            assignment,
            cluster_count: k,
            summary,
        })
    }
}

struct LloydRun {
    assignment: Vec<ClusterId>,
    inertia: f64,
    iterations: usize,
}

fn lloyd<R: Rng>(points: &[&[f64]], k: usize, max_iterations: usize, rng: &mut R) -> LloydRun {
    let n = points.len();
    let mut centroids = kmeans_plus_plus(points, k, rng);
    let mut assignment = vec![usize::MAX; n];
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        let mut changed = false;

        for (i, point) in points.iter().enumerate() {
            let nearest = nearest_centroid(point, &centroids);
            if assignment[i] != nearest {
                assignment[i] = nearest;
                changed = true;
            }
        }

        if reseed_empty_clusters(points, &mut assignment, &centroids, k) {
            changed = true;
        }
        centroids = compute_centroids(points, &assignment, k);

        if !changed {
            break;
        }
    }

    let inertia = points
        .iter()
        .zip(&assignment)
        .map(|(p, &c)| squared_euclidean(p, &centroids[c]))
        .sum();

    LloydRun {
        assignment,
        inertia,
        iterations,
    }
}

// Ties go to the lowest cluster index.
fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> ClusterId {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_euclidean(point, centroid);
        if d < best_distance {
            best_distance = d;
            best = c;
        }
    }
    best
}

fn kmeans_plus_plus<R: Rng>(points: &[&[f64]], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut chosen = vec![false; n];
    let first = rng.random_range(0..n);
    chosen[first] = true;
    let mut centroids = vec![points[first].to_vec()];
    let mut distances: Vec<f64> = points
        .iter()
        .map(|p| squared_euclidean(p, points[first]))
        .collect();

    while centroids.len() < k {
        let total: f64 = distances.iter().sum();
        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = None;
            for (i, d) in distances.iter().enumerate() {
                cumulative += d;
                if cumulative > target && !chosen[i] {
                    pick = Some(i);
                    break;
                }
            }
            // Rounding can leave `target` just above the final sum.
            pick.or_else(|| (0..n).rev().find(|&i| !chosen[i] && distances[i] > 0.0))
        } else {
            None
        };
        let next = match next {
            Some(i) => i,
            None => {
                // Every remaining point coincides with a centre.
                let unchosen: Vec<usize> = (0..n).filter(|&i| !chosen[i]).collect();
                unchosen[rng.random_range(0..unchosen.len())]
            }
        };

        chosen[next] = true;
        centroids.push(points[next].to_vec());
        for (d, p) in distances.iter_mut().zip(points) {
            *d = d.min(squared_euclidean(p, points[next]));
        }
    }
    centroids
}

// Moves the point farthest from its centroid (taken from a cluster with
// more than one member) into each empty cluster.
fn reseed_empty_clusters(
    points: &[&[f64]],
    assignment: &mut [ClusterId],
    centroids: &[Vec<f64>],
    k: usize,
) -> bool {
    let mut counts = vec![0usize; k];
    for &c in assignment.iter() {
        counts[c] += 1;
    }

    let mut reseeded = false;
    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let farthest = (0..points.len())
            .filter(|&i| counts[assignment[i]] > 1)
            .max_by(|&a, &b| {
                let da = squared_euclidean(points[a], &centroids[assignment[a]]);
                let db = squared_euclidean(points[b], &centroids[assignment[b]]);
                da.total_cmp(&db).then(b.cmp(&a))
            });
        if let Some(i) = farthest {
            counts[assignment[i]] -= 1;
            assignment[i] = empty;
            counts[empty] = 1;
            reseeded = true;
        }
    }
    reseeded
}

fn compute_centroids(points: &[&[f64]], assignment: &[ClusterId], k: usize) -> Vec<Vec<f64>> {
    let dimension = points.first().map_or(0, |p| p.len());
    let mut sums = vec![vec![0.0; dimension]; k];
    let mut counts = vec![0usize; k];
    for (point, &c) in points.iter().zip(assignment) {
        counts[c] += 1;
        for (acc, value) in sums[c].iter_mut().zip(point.iter()) {
            *acc += value;
        }
    }
    for (sum, count) in sums.iter_mut().zip(&counts) {
        if *count > 0 {
            let n = *count as f64;
            for value in sum.iter_mut() {
                *value /= n;
            }
        }
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn stores(points: &[(f64, f64)]) -> Vec<Store> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Store::with_features(format!("s{i}"), vec![x, y], 20.0))
            .collect()
    }

    fn config(n_init: usize) -> BaseClusteringConfig {
        BaseClusteringConfig {
            n_init,
            max_iterations: 100,
        }
    }

    #[test]
    fn test_separates_obvious_groups() {
        let stores = stores(&[
            (0.0, 0.0),
            (0.1, 0.0),
            (0.0, 0.1),
            (10.0, 10.0),
            (10.1, 10.0),
            (10.0, 10.1),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let partition = BaseClusterer::new(2, &config(10))
            .partition(&stores, &mut rng)
            .unwrap();

        let a = partition.assignment[0];
        let b = partition.assignment[3];
        assert_ne!(a, b);
        assert_eq!(&partition.assignment[..3], &[a, a, a]);
        assert_eq!(&partition.assignment[3..], &[b, b, b]);
        assert!(partition.summary.inertia < 0.1);
        assert_eq!(partition.summary.restarts, 10);
    }

    #[test]
    fn test_same_seed_same_partition() {
        let points: Vec<(f64, f64)> = (0..60)
            .map(|i| ((i % 7) as f64 * 1.3, (i % 11) as f64 * 0.7))
            .collect();
        let stores = stores(&points);
        let clusterer = BaseClusterer::new(5, &config(4));

        let first = clusterer
            .partition(&stores, &mut ChaCha8Rng::seed_from_u64(99))
            .unwrap();
        let second = clusterer
            .partition(&stores, &mut ChaCha8Rng::seed_from_u64(99))
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_no_empty_clusters_with_duplicate_points() {
        let stores = stores(&[(1.0, 1.0); 8]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let partition = BaseClusterer::new(4, &config(3))
            .partition(&stores, &mut rng)
            .unwrap();

        let mut counts = [0usize; 4];
        for &c in &partition.assignment {
            counts[c] += 1;
        }
        assert!(counts.iter().all(|&c| c > 0), "counts: {counts:?}");
    }

    #[test]
    fn test_single_cluster() {
        let stores = stores(&[(0.0, 0.0), (2.0, 0.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let partition = BaseClusterer::new(1, &config(2))
            .partition(&stores, &mut rng)
            .unwrap();
        assert_eq!(partition.assignment, vec![0, 0]);
        assert_eq!(partition.summary.inertia, 2.0);
    }

    #[test]
    fn test_recovers_fixture_blobs() {
        let records = storeforge_test::blob_records(&[15, 12, 18, 15], 2, 6);
        let stores: Vec<Store> = records
            .iter()
            .map(|r| Store::with_features(r.store_id.clone(), r.recent_features.clone(), r.covariate))
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let partition = BaseClusterer::new(4, &config(10))
            .partition(&stores, &mut rng)
            .unwrap();

        let mut start = 0;
        for size in [15, 12, 18, 15] {
            let blob = &partition.assignment[start..start + size];
            assert!(blob.iter().all(|&c| c == blob[0]));
            start += size;
        }
    }

    #[test]
    fn test_rejects_more_clusters_than_stores() {
        let stores = stores(&[(0.0, 0.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let result = BaseClusterer::new(2, &config(1)).partition(&stores, &mut rng);
        assert!(matches!(result, Err(ClusteringError::Internal(_))));
    }
}
