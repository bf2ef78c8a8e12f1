//! Error types for StoreForge

use thiserror::Error;

/// Main error type for clustering runs.
///
/// Only conditions that prevent a run from producing any result are errors.
/// Recoverable conditions (missing reference data, oscillating stores, an
/// exhausted repair budget) are recorded in the run report instead.
#[derive(Debug, Error)]
pub enum ClusteringError {
    /// The size bounds cannot be satisfied for the given store count.
    #[error(
        "Configuration infeasible: {store_count} stores cannot form clusters of \
         {min_stores}..={max_stores} stores (cluster count range [{min_clusters}, {max_clusters}] is empty)"
    )]
    ConfigurationInfeasible {
        store_count: usize,
        min_stores: usize,
        max_stores: usize,
        min_clusters: usize,
        max_clusters: usize,
    },

    /// The store feature table is malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error in run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for StoreForge operations
pub type Result<T> = std::result::Result<T, ClusteringError>;
