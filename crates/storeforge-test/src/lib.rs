//! Shared test fixtures for StoreForge crates.
//!
//! Seeded synthetic store tables:
//!
//! - [`blob_records`] - stores grouped in well-separated feature blobs,
//!   each blob sharing a narrow climate band
//! - [`uniform_records`] - stores with uniformly random features and
//!   covariates
//! - [`scenario_a_records`] - the 2264-store regional table
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! storeforge-test = { workspace = true }
//! ```
//!
//! Then generate the table you need:
//!
//! ```
//! use storeforge_test::blob_records;
//!
//! let records = blob_records(&[4, 4, 5], 2, 7);
//! assert_eq!(records.len(), 13);
//! assert_eq!(records[0].store_id, "b00-s0000");
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use storeforge_core::StoreRecord;

/// Distance between neighbouring blob centres.
pub const BLOB_SPACING: f64 = 20.0;

/// Half-width of the uniform feature noise around a blob centre.
pub const BLOB_SPREAD: f64 = 1.0;

/// Half-width of the covariate noise around a blob's climate band.
pub const COVARIATE_SPREAD: f64 = 0.4;

/// Stores grouped into blobs of the given sizes.
///
/// Blob centres sit on a sheared grid at least `BLOB_SPACING` apart. Reference-season
/// features follow the same centres with independent noise. Each blob gets
/// its own climate band, and covariates inside a blob span at most
/// `2 * COVARIATE_SPREAD`.
pub fn blob_records(sizes: &[usize], dimension: usize, seed: u64) -> Vec<StoreRecord> {
    assert!(dimension > 0, "dimension must be > 0");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let columns = (sizes.len() as f64).sqrt().ceil().max(1.0) as usize;
    let mut records = Vec::with_capacity(sizes.iter().sum());

    for (blob, &size) in sizes.iter().enumerate() {
        let centre = blob_centre(blob, columns, dimension);
        let climate = 10.0 + (blob % 8) as f64 * 3.0;

        for idx in 0..size {
            let recent = jitter(&centre, BLOB_SPREAD, &mut rng);
            let reference = jitter(&centre, BLOB_SPREAD, &mut rng);
            let covariate = climate + rng.random_range(-COVARIATE_SPREAD..COVARIATE_SPREAD);
            records.push(StoreRecord::new(
                format!("b{blob:02}-s{idx:04}"),
                recent,
                Some(reference),
                covariate,
            ));
        }
    }
    records
}

/// Stores with features uniform in `[0, 100)` and covariates uniform in
/// `[0, covariate_span)`.
pub fn uniform_records(
    count: usize,
    dimension: usize,
    covariate_span: f64,
    seed: u64,
) -> Vec<StoreRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|idx| {
            let recent = (0..dimension).map(|_| rng.random_range(0.0..100.0)).collect();
            let reference = (0..dimension).map(|_| rng.random_range(0.0..100.0)).collect();
            let covariate = rng.random_range(0.0..covariate_span);
            StoreRecord::new(format!("u{idx:05}"), recent, Some(reference), covariate)
        })
        .collect()
}

/// 2264 stores in 54 blobs: 50 of 42 stores and 4 of 41.
pub fn scenario_a_records(seed: u64) -> Vec<StoreRecord> {
    let mut sizes = vec![42; 50];
    sizes.extend([41; 4]);
    blob_records(&sizes, 2, seed)
}

/// Drops reference-season features from every `n`-th record, starting at
/// the first.
pub fn without_reference_every(mut records: Vec<StoreRecord>, n: usize) -> Vec<StoreRecord> {
    assert!(n > 0, "n must be > 0");
    for record in records.iter_mut().step_by(n) {
        record.reference_features = None;
    }
    records
}

/// Sheared grid, so that every dimension separates the blobs and none
/// carries noise only.
fn blob_centre(blob: usize, columns: usize, dimension: usize) -> Vec<f64> {
    let (column, row) = ((blob % columns) as f64, (blob / columns) as f64);
    (0..dimension)
        .map(|d| match d {
            0 if dimension == 1 => blob as f64 * BLOB_SPACING,
            0 => column * BLOB_SPACING,
            1 => (row + column / 2.0) * BLOB_SPACING,
            _ => (blob % (d + 1)) as f64 * BLOB_SPACING,
        })
        .collect()
}

fn jitter<R: Rng>(centre: &[f64], spread: f64, rng: &mut R) -> Vec<f64> {
    centre
        .iter()
        .map(|c| c + rng.random_range(-spread..spread))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_records_are_seeded() {
        assert_eq!(blob_records(&[3, 3], 2, 1), blob_records(&[3, 3], 2, 1));
        assert_ne!(blob_records(&[3, 3], 2, 1), blob_records(&[3, 3], 2, 2));
    }

    #[test]
    fn test_blob_covariates_stay_in_band() {
        let records = blob_records(&[20, 20], 3, 5);
        for blob in records.chunks(20) {
            let (lo, hi) = blob.iter().fold((f64::MAX, f64::MIN), |(lo, hi), r| {
                (lo.min(r.covariate), hi.max(r.covariate))
            });
            assert!(hi - lo <= 2.0 * COVARIATE_SPREAD);
        }
    }

    #[test]
    fn test_scenario_a_size() {
        assert_eq!(scenario_a_records(42).len(), 2264);
    }

    #[test]
    fn test_without_reference_every() {
        let records = without_reference_every(uniform_records(7, 2, 5.0, 3), 3);
        let missing: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.reference_features.is_none())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(missing, vec![0, 3, 6]);
    }
}
