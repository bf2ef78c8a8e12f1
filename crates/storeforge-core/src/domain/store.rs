//! Store input rows and loaded stores.

use serde::{Deserialize, Serialize};

/// One row of the upstream store feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub store_id: String,
    /// Features of the most recently completed season.
    pub recent_features: Vec<f64>,
    /// Features of the year-over-year reference season, when available.
    #[serde(default)]
    pub reference_features: Option<Vec<f64>>,
    /// Climate covariate (e.g. average seasonal temperature).
    pub covariate: f64,
}

impl StoreRecord {
    pub fn new(
        store_id: impl Into<String>,
        recent_features: Vec<f64>,
        reference_features: Option<Vec<f64>>,
        covariate: f64,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            recent_features,
            reference_features,
            covariate,
        }
    }
}

/// Data availability of a store's seasonal inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFlag {
    /// Both seasons were available and blended.
    #[default]
    Complete,
    /// No reference season; features come from the recent season alone.
    ReferenceMissing,
}

/// A store loaded for a run. Immutable once built by the blender.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    id: String,
    features: Vec<f64>,
    covariate: f64,
    recent_features: Vec<f64>,
    reference_features: Option<Vec<f64>>,
    data_flag: DataFlag,
}

impl Store {
    pub fn new(
        id: impl Into<String>,
        features: Vec<f64>,
        covariate: f64,
        recent_features: Vec<f64>,
        reference_features: Option<Vec<f64>>,
        data_flag: DataFlag,
    ) -> Self {
        Self {
            id: id.into(),
            features,
            covariate,
            recent_features,
            reference_features,
            data_flag,
        }
    }

    /// Builds a store whose blended features are already known.
    ///
    /// Convenient for tests and for callers that blend upstream.
    pub fn with_features(id: impl Into<String>, features: Vec<f64>, covariate: f64) -> Self {
        let recent = features.clone();
        Self::new(id, features, covariate, recent, None, DataFlag::Complete)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Blended feature vector used for all distance computations.
    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn covariate(&self) -> f64 {
        self.covariate
    }

    pub fn recent_features(&self) -> &[f64] {
        &self.recent_features
    }

    pub fn reference_features(&self) -> Option<&[f64]> {
        self.reference_features.as_deref()
    }

    pub fn data_flag(&self) -> DataFlag {
        self.data_flag
    }

    pub fn dimension(&self) -> usize {
        self.features.len()
    }
}
