//! Seasonal feature blending.
//!
//! Each season is normalised independently to zero mean and unit variance
//! (statistics computed once over the whole population) before the two
//! seasons are combined with the configured weights.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use storeforge_config::ConstraintConfig;
use storeforge_core::{ClusteringError, DataFlag, Result, Store, StoreRecord};
use tracing::{debug, warn};

/// Per-dimension z-score statistics of one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub mean: Vec<f64>,
    /// Population standard deviation; 0 marks a constant dimension.
    pub std_dev: Vec<f64>,
    /// Number of stores the statistics were computed over.
    pub sample_count: usize,
}

impl NormalizationStats {
    /// Fits mean and population standard deviation over `rows`.
    pub fn fit<'a>(rows: impl Iterator<Item = &'a [f64]> + Clone, dimension: usize) -> Self {
        let mut mean = vec![0.0; dimension];
        let mut sample_count = 0usize;
        for row in rows.clone() {
            for (acc, value) in mean.iter_mut().zip(row) {
                *acc += value;
            }
            sample_count += 1;
        }
        if sample_count == 0 {
            return Self {
                mean,
                std_dev: vec![0.0; dimension],
                sample_count,
            };
        }
        let n = sample_count as f64;
        for m in &mut mean {
            *m /= n;
        }

        let mut variance = vec![0.0; dimension];
        for row in rows {
            for ((acc, value), m) in variance.iter_mut().zip(row).zip(&mean) {
                *acc += (value - m) * (value - m);
            }
        }
        let std_dev = variance.into_iter().map(|v| (v / n).sqrt()).collect();

        Self {
            mean,
            std_dev,
            sample_count,
        }
    }

    /// Maps a row to z-scores. Constant dimensions map to 0.
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.mean)
            .zip(&self.std_dev)
            .map(|((value, mean), std_dev)| {
                if *std_dev > 0.0 {
                    (value - mean) / std_dev
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// What the blender did, kept for the run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendReport {
    pub recent_weight: f64,
    pub reference_weight: f64,
    pub recent: NormalizationStats,
    /// `None` when no store had reference-season data.
    pub reference: Option<NormalizationStats>,
    /// Stores that fell back to recent-season features only.
    pub incomplete_store_ids: Vec<String>,
}

/// Loaded stores plus the blend report.
#[derive(Debug, Clone)]
pub struct BlendOutcome {
    pub stores: Vec<Store>,
    pub report: BlendReport,
}

/// Combines recent and reference season features per store.
///
/// # Example
///
/// ```
/// use storeforge_core::{DataFlag, StoreRecord};
/// use storeforge_engine::SeasonalFeatureBlender;
///
/// let records = vec![
///     StoreRecord::new("a", vec![1.0], Some(vec![10.0]), 20.0),
///     StoreRecord::new("b", vec![3.0], Some(vec![30.0]), 21.0),
///     StoreRecord::new("c", vec![2.0], None, 22.0),
/// ];
/// let outcome = SeasonalFeatureBlender::new(0.5, 0.5).blend(&records).unwrap();
///
/// assert_eq!(outcome.stores[2].data_flag(), DataFlag::ReferenceMissing);
/// assert_eq!(outcome.report.incomplete_store_ids, vec!["c".to_string()]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SeasonalFeatureBlender {
    recent_weight: f64,
    reference_weight: f64,
}

impl SeasonalFeatureBlender {
    pub fn new(recent_weight: f64, reference_weight: f64) -> Self {
        Self {
            recent_weight,
            reference_weight,
        }
    }

    pub fn from_constraints(constraints: &ConstraintConfig) -> Self {
        Self::new(constraints.recent_weight, constraints.reference_weight)
    }

    /// Validates the feature table and blends every store.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for duplicate store ids, empty or ragged
    /// feature vectors and non-finite values.
    pub fn blend(&self, records: &[StoreRecord]) -> Result<BlendOutcome> {
        let dimension = validate_records(records)?;

        let recent = NormalizationStats::fit(
            records.iter().map(|r| r.recent_features.as_slice()),
            dimension,
        );
        let reference_rows = records
            .iter()
            .filter_map(|r| r.reference_features.as_deref());
        let reference = if reference_rows.clone().next().is_some() {
            Some(NormalizationStats::fit(reference_rows, dimension))
        } else {
            None
        };

        let mut incomplete_store_ids = Vec::new();
        let stores = records
            .iter()
            .map(|record| {
                let recent_z = recent.transform(&record.recent_features);
                match (&record.reference_features, &reference) {
                    (Some(ref_features), Some(stats)) => {
                        let reference_z = stats.transform(ref_features);
                        let blended = recent_z
                            .iter()
                            .zip(&reference_z)
                            .map(|(r, y)| self.recent_weight * r + self.reference_weight * y)
                            .collect();
                        Store::new(
                            record.store_id.clone(),
                            blended,
                            record.covariate,
                            record.recent_features.clone(),
                            Some(ref_features.clone()),
                            DataFlag::Complete,
                        )
                    }
                    _ => {
                        warn!(
                            event = "data_incomplete",
                            store = %record.store_id,
                            "reference season missing, using recent season only"
                        );
                        incomplete_store_ids.push(record.store_id.clone());
                        Store::new(
                            record.store_id.clone(),
                            recent_z,
                            record.covariate,
                            record.recent_features.clone(),
                            None,
                            DataFlag::ReferenceMissing,
                        )
                    }
                }
            })
            .collect::<Vec<_>>();

        debug!(
            event = "blend_end",
            store_count = stores.len() as u64,
            dimension = dimension as u64,
            incomplete = incomplete_store_ids.len() as u64,
        );

        Ok(BlendOutcome {
            stores,
            report: BlendReport {
                recent_weight: self.recent_weight,
                reference_weight: self.reference_weight,
                recent,
                reference,
                incomplete_store_ids,
            },
        })
    }
}

// Returns the shared feature dimension.
fn validate_records(records: &[StoreRecord]) -> Result<usize> {
    let Some(first) = records.first() else {
        return Ok(0);
    };
    let dimension = first.recent_features.len();
    if dimension == 0 {
        return Err(ClusteringError::InvalidInput(format!(
            "store {} has an empty recent-season feature vector",
            first.store_id
        )));
    }

    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.store_id.as_str()) {
            return Err(ClusteringError::InvalidInput(format!(
                "duplicate store id {}",
                record.store_id
            )));
        }
        if record.recent_features.len() != dimension {
            return Err(ClusteringError::InvalidInput(format!(
                "store {} has {} recent-season features, expected {}",
                record.store_id,
                record.recent_features.len(),
                dimension
            )));
        }
        if let Some(reference) = &record.reference_features {
            if reference.len() != dimension {
                return Err(ClusteringError::InvalidInput(format!(
                    "store {} has {} reference-season features, expected {}",
                    record.store_id,
                    reference.len(),
                    dimension
                )));
            }
        }
        let mut all_values = record
            .recent_features
            .iter()
            .chain(record.reference_features.iter().flatten());
        if !record.covariate.is_finite() || all_values.any(|v| !v.is_finite()) {
            return Err(ClusteringError::InvalidInput(format!(
                "store {} has a non-finite feature or covariate value",
                record.store_id
            )));
        }
    }
    Ok(dimension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, recent: Vec<f64>, reference: Option<Vec<f64>>) -> StoreRecord {
        StoreRecord::new(id, recent, reference, 20.0)
    }

    #[test]
    fn test_normalization_stats() {
        let rows = [vec![1.0, 5.0], vec![3.0, 5.0]];
        let stats = NormalizationStats::fit(rows.iter().map(Vec::as_slice), 2);

        assert_eq!(stats.mean, vec![2.0, 5.0]);
        assert_eq!(stats.std_dev, vec![1.0, 0.0]);
        assert_eq!(stats.transform(&[3.0, 5.0]), vec![1.0, 0.0]);
    }

    #[test]
    fn test_blend_weights_normalized_seasons() {
        let records = vec![
            record("a", vec![0.0], Some(vec![100.0])),
            record("b", vec![2.0], Some(vec![300.0])),
        ];
        let outcome = SeasonalFeatureBlender::new(0.75, 0.25)
            .blend(&records)
            .unwrap();

        // Both seasons normalise to [-1, 1] regardless of scale.
        assert_eq!(outcome.stores[0].features(), &[-1.0]);
        assert_eq!(outcome.stores[1].features(), &[1.0]);
        assert!(outcome.report.incomplete_store_ids.is_empty());
    }

    #[test]
    fn test_blend_seasons_pull_in_opposite_directions() {
        let records = vec![
            record("a", vec![0.0], Some(vec![1.0])),
            record("b", vec![1.0], Some(vec![0.0])),
        ];
        let outcome = SeasonalFeatureBlender::new(0.5, 0.5).blend(&records).unwrap();
        assert_eq!(outcome.stores[0].features(), &[0.0]);
        assert_eq!(outcome.stores[1].features(), &[0.0]);
    }

    #[test]
    fn test_missing_reference_falls_back_to_recent_only() {
        let records = vec![
            record("a", vec![0.0], Some(vec![5.0])),
            record("b", vec![2.0], Some(vec![7.0])),
            record("c", vec![2.0], None),
        ];
        let outcome = SeasonalFeatureBlender::new(0.6, 0.4).blend(&records).unwrap();

        let fallback = &outcome.stores[2];
        assert_eq!(fallback.data_flag(), DataFlag::ReferenceMissing);
        assert!(fallback.reference_features().is_none());
        // Full recent-season z-score, not scaled by recent_weight.
        let expected = outcome.report.recent.transform(&[2.0]);
        assert_eq!(fallback.features(), expected.as_slice());
        assert_eq!(outcome.report.incomplete_store_ids, vec!["c".to_string()]);
        assert_eq!(outcome.report.reference.as_ref().unwrap().sample_count, 2);
    }

    #[test]
    fn test_no_reference_data_at_all() {
        let records = vec![record("a", vec![1.0], None), record("b", vec![3.0], None)];
        let outcome = SeasonalFeatureBlender::new(0.6, 0.4).blend(&records).unwrap();

        assert!(outcome.report.reference.is_none());
        assert_eq!(outcome.report.incomplete_store_ids.len(), 2);
        assert_eq!(outcome.stores[1].features(), &[1.0]);
    }

    #[test]
    fn test_rejects_ragged_features() {
        let records = vec![
            record("a", vec![1.0, 2.0], None),
            record("b", vec![1.0], None),
        ];
        let result = SeasonalFeatureBlender::new(0.6, 0.4).blend(&records);
        assert!(matches!(result, Err(ClusteringError::InvalidInput(_))));

        let records = vec![record("a", vec![1.0, 2.0], Some(vec![1.0]))];
        let result = SeasonalFeatureBlender::new(0.6, 0.4).blend(&records);
        assert!(matches!(result, Err(ClusteringError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_duplicates_and_non_finite_values() {
        let records = vec![record("a", vec![1.0], None), record("a", vec![2.0], None)];
        assert!(SeasonalFeatureBlender::new(0.6, 0.4).blend(&records).is_err());

        let records = vec![record("a", vec![f64::NAN], None)];
        assert!(SeasonalFeatureBlender::new(0.6, 0.4).blend(&records).is_err());

        let records = vec![StoreRecord::new("a", vec![1.0], None, f64::INFINITY)];
        assert!(SeasonalFeatureBlender::new(0.6, 0.4).blend(&records).is_err());
    }

    #[test]
    fn test_empty_table_blends_to_nothing() {
        let outcome = SeasonalFeatureBlender::new(0.6, 0.4).blend(&[]).unwrap();
        assert!(outcome.stores.is_empty());
    }
}
