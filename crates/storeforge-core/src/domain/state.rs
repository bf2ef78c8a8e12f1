//! Working clustering state shared by validation and repair.

use crate::error::{ClusteringError, Result};

use super::{euclidean_distance, Cluster, ClusterId, Store};

/// Explicit, owned state of a clustering run.
///
/// Holds the loaded stores, the store→cluster assignment and every cluster
/// with its derived statistics. The repair loop receives it by `&mut` and
/// applies exactly one [`move_store`](Self::move_store) per step; all derived
/// values of the two touched clusters are refreshed synchronously.
#[derive(Debug, Clone)]
pub struct ClusteringState {
    stores: Vec<Store>,
    assignment: Vec<ClusterId>,
    clusters: Vec<Cluster>,
}

impl ClusteringState {
    /// Builds the state from an assignment vector.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the assignment length does not match the
    /// store count or references a cluster outside `0..cluster_count`, and
    /// `Internal` if any cluster would be empty.
    pub fn from_assignment(
        stores: Vec<Store>,
        assignment: Vec<ClusterId>,
        cluster_count: usize,
    ) -> Result<Self> {
        if assignment.len() != stores.len() {
            return Err(ClusteringError::InvalidInput(format!(
                "assignment covers {} stores but {} were loaded",
                assignment.len(),
                stores.len()
            )));
        }
        let dimension = stores.first().map_or(0, Store::dimension);
        let mut clusters: Vec<Cluster> = (0..cluster_count)
            .map(|id| Cluster::empty(id, dimension))
            .collect();

        for (store_index, &cluster_id) in assignment.iter().enumerate() {
            let cluster = clusters.get_mut(cluster_id).ok_or_else(|| {
                ClusteringError::InvalidInput(format!(
                    "store {} assigned to cluster {} but only {} clusters exist",
                    stores[store_index].id(),
                    cluster_id,
                    cluster_count
                ))
            })?;
            cluster.insert(store_index);
        }

        if let Some(empty) = clusters.iter().find(|c| c.is_empty()) {
            return Err(ClusteringError::Internal(format!(
                "cluster {} has no members",
                empty.id()
            )));
        }

        for cluster in &mut clusters {
            cluster.refresh(&stores);
        }

        Ok(Self {
            stores,
            assignment,
            clusters,
        })
    }

    pub fn stores(&self) -> &[Store] {
        &self.stores
    }

    pub fn store(&self, store_index: usize) -> &Store {
        &self.stores[store_index]
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster(&self, id: ClusterId) -> &Cluster {
        &self.clusters[id]
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Store index → cluster id.
    pub fn assignment(&self) -> &[ClusterId] {
        &self.assignment
    }

    pub fn cluster_of(&self, store_index: usize) -> ClusterId {
        self.assignment[store_index]
    }

    /// Moves one store and refreshes both affected clusters.
    ///
    /// Returns the cluster the store left. Moving a store to the cluster it
    /// already belongs to is a no-op.
    pub fn move_store(&mut self, store_index: usize, to: ClusterId) -> ClusterId {
        let from = self.assignment[store_index];
        if from == to {
            return from;
        }
        self.clusters[from].remove(store_index);
        self.clusters[to].insert(store_index);
        self.assignment[store_index] = to;
        self.clusters[from].refresh(&self.stores);
        self.clusters[to].refresh(&self.stores);
        from
    }

    /// Euclidean distance between a store's features and a cluster centroid.
    pub fn distance_to_centroid(&self, store_index: usize, cluster: ClusterId) -> f64 {
        euclidean_distance(
            self.stores[store_index].features(),
            self.clusters[cluster].centroid(),
        )
    }

    /// Covariate range of `cluster` if `store_index` were removed from it.
    pub fn covariate_range_without(&self, cluster: ClusterId, store_index: usize) -> f64 {
        let (min, max) = self.clusters[cluster]
            .members()
            .filter(|&idx| idx != store_index)
            .map(|idx| self.stores[idx].covariate())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c), hi.max(c))
            });
        if min > max {
            0.0
        } else {
            max - min
        }
    }

    /// Covariate range of `cluster` if `store_index` were added to it.
    pub fn covariate_range_with(&self, cluster: ClusterId, store_index: usize) -> f64 {
        let target = &self.clusters[cluster];
        let covariate = self.stores[store_index].covariate();
        if target.is_empty() {
            return 0.0;
        }
        target.covariate_max().max(covariate) - target.covariate_min().min(covariate)
    }

    /// Median covariate of a cluster's members (mean of the middle pair for
    /// even sizes). `None` for empty clusters.
    pub fn covariate_median(&self, cluster: ClusterId) -> Option<f64> {
        let mut values: Vec<f64> = self.clusters[cluster]
            .members()
            .map(|idx| self.stores[idx].covariate())
            .collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let mid = values.len() / 2;
        if values.len() % 2 == 0 {
            Some((values[mid - 1] + values[mid]) / 2.0)
        } else {
            Some(values[mid])
        }
    }

    /// Checks coverage, disjointness and non-emptiness.
    ///
    /// # Errors
    ///
    /// Returns `Internal` describing the first broken invariant.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = vec![false; self.stores.len()];
        for cluster in &self.clusters {
            if cluster.is_empty() {
                return Err(ClusteringError::Internal(format!(
                    "cluster {} has no members",
                    cluster.id()
                )));
            }
            for idx in cluster.members() {
                if seen[idx] {
                    return Err(ClusteringError::Internal(format!(
                        "store {} belongs to more than one cluster",
                        self.stores[idx].id()
                    )));
                }
                seen[idx] = true;
                if self.assignment[idx] != cluster.id() {
                    return Err(ClusteringError::Internal(format!(
                        "store {} is a member of cluster {} but assigned to {}",
                        self.stores[idx].id(),
                        cluster.id(),
                        self.assignment[idx]
                    )));
                }
            }
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(ClusteringError::Internal(format!(
                "store {} is not in any cluster",
                self.stores[missing].id()
            )));
        }
        Ok(())
    }
}
