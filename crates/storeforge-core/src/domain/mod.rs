//! Domain model: stores, clusters and the working clustering state.

mod cluster;
mod state;
mod store;

pub use cluster::{Cluster, ClusterId};
pub use state::ClusteringState;
pub use store::{DataFlag, Store, StoreRecord};

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Euclidean distance between two equal-length vectors.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}
