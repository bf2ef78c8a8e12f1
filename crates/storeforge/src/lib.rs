//! StoreForge - constrained seasonal store clustering in Rust
//!
//! Groups retail stores into clusters that share sales behaviour across
//! seasons while every cluster respects a size band and a climate band.
//!
//! # Example
//!
//! ```rust
//! use storeforge::prelude::*;
//!
//! let records: Vec<StoreRecord> = (0..8)
//!     .map(|i| {
//!         let x = if i < 4 { 0.0 } else { 10.0 } + i as f64 * 0.1;
//!         StoreRecord::new(format!("store-{i}"), vec![x], Some(vec![x]), 18.0)
//!     })
//!     .collect();
//! let config = ClusteringConfig::default()
//!     .with_constraints(ConstraintConfig::with_sizes(3, 5, 4));
//!
//! let output = cluster_stores_with(&records, config).unwrap();
//! assert_eq!(output.cluster_count(), 2);
//! assert!(output.report.is_compliant());
//! ```

mod cluster;

pub use cluster::{cluster_stores, cluster_stores_with, read_records};

pub use storeforge_config::{
    BaseClusteringConfig, ClusteringConfig, ConfigError, ConstraintConfig, RebalanceConfig,
};
pub use storeforge_core::{
    ClusterId, ClusteringError, DataFlag, Result, StoreRecord, Violation, ViolationKind,
};
pub use storeforge_engine::{
    run_batch, AbortReason, AssignmentRecord, ClusterProfile, ClusteringEngine, ClusteringJob,
    ClusteringOutput, FeasibilityAnalysis, FinalState, OutputError, RepairStep, RunReport,
    RunWarning,
};

#[cfg(feature = "console")]
pub use storeforge_console as console;

pub mod prelude {
    pub use super::{cluster_stores, cluster_stores_with};
    pub use super::{ClusteringConfig, ConstraintConfig};
    pub use super::{ClusteringError, ClusteringOutput, FinalState, StoreRecord};
}
