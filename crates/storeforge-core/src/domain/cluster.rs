//! Cluster membership and derived statistics.

use std::collections::BTreeSet;

use super::Store;

/// Dense cluster identifier in `0..cluster_count`.
pub type ClusterId = usize;

/// A group of stores with its derived centroid and covariate band.
///
/// Members are store indices into the owning [`ClusteringState`]'s store
/// list. Derived values are refreshed by the state after every membership
/// change, so they are always consistent with `members`.
///
/// [`ClusteringState`]: super::ClusteringState
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    id: ClusterId,
    members: BTreeSet<usize>,
    centroid: Vec<f64>,
    covariate_min: f64,
    covariate_max: f64,
}

impl Cluster {
    pub(crate) fn empty(id: ClusterId, dimension: usize) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            centroid: vec![0.0; dimension],
            covariate_min: 0.0,
            covariate_max: 0.0,
        }
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member store indices in ascending order.
    pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    pub fn contains(&self, store_index: usize) -> bool {
        self.members.contains(&store_index)
    }

    /// Mean blended feature vector of the members.
    pub fn centroid(&self) -> &[f64] {
        &self.centroid
    }

    pub fn covariate_min(&self) -> f64 {
        self.covariate_min
    }

    pub fn covariate_max(&self) -> f64 {
        self.covariate_max
    }

    /// Max minus min covariate among members; 0 for empty clusters.
    pub fn covariate_range(&self) -> f64 {
        self.covariate_max - self.covariate_min
    }

    pub(crate) fn insert(&mut self, store_index: usize) -> bool {
        self.members.insert(store_index)
    }

    pub(crate) fn remove(&mut self, store_index: usize) -> bool {
        self.members.remove(&store_index)
    }

    /// Recomputes centroid and covariate band from the current members.
    pub(crate) fn refresh(&mut self, stores: &[Store]) {
        let dimension = self.centroid.len();
        let mut sum = vec![0.0; dimension];
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for &idx in &self.members {
            let store = &stores[idx];
            for (acc, value) in sum.iter_mut().zip(store.features()) {
                *acc += value;
            }
            min = min.min(store.covariate());
            max = max.max(store.covariate());
        }

        if self.members.is_empty() {
            self.centroid = sum;
            self.covariate_min = 0.0;
            self.covariate_max = 0.0;
            return;
        }

        let n = self.members.len() as f64;
        self.centroid = sum.into_iter().map(|s| s / n).collect();
        self.covariate_min = min;
        self.covariate_max = max;
    }
}
