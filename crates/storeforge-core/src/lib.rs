//! StoreForge Core - domain types for constrained store clustering
//!
//! This crate provides the fundamental abstractions shared by every
//! StoreForge crate:
//! - Store records and loaded stores with their data-availability flags
//! - Clusters and the explicit `ClusteringState` mutated by the repair loop
//! - Constraint violations and their magnitudes
//! - The error taxonomy for clustering runs

pub mod domain;
pub mod error;
pub mod violation;

pub use domain::{
    euclidean_distance, squared_euclidean, Cluster, ClusterId, ClusteringState, DataFlag, Store,
    StoreRecord,
};
pub use error::{ClusteringError, Result};
pub use violation::{Violation, ViolationKind};
