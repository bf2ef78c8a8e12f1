//! Constraint violations reported by the validator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::ClusterId;

/// The bound a cluster breaches.
///
/// Declaration order doubles as the tie-break order when two violations
/// share the same magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    /// More members than `max_stores_per_cluster`.
    SizeTooLarge,
    /// Fewer members than `min_stores_per_cluster`.
    SizeTooSmall,
    /// Covariate spread above `max_covariate_range`.
    CovariateRangeExceeded,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::SizeTooLarge => "SIZE_TOO_LARGE",
            ViolationKind::SizeTooSmall => "SIZE_TOO_SMALL",
            ViolationKind::CovariateRangeExceeded => "COVARIATE_RANGE_EXCEEDED",
        };
        f.write_str(name)
    }
}

/// A single breached bound on a single cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub cluster_id: ClusterId,
    pub kind: ViolationKind,
    /// How far outside the bound the cluster is: a store count for size
    /// violations, covariate units for range violations.
    pub magnitude: f64,
}

impl Violation {
    pub fn new(cluster_id: ClusterId, kind: ViolationKind, magnitude: f64) -> Self {
        Self {
            cluster_id,
            kind,
            magnitude,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cluster {} {} by {:.3}",
            self.cluster_id, self.kind, self.magnitude
        )
    }
}
