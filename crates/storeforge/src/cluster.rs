//! Entry points that hide the engine wiring.

use std::path::Path;

use storeforge_config::ClusteringConfig;
use storeforge_core::{ClusteringError, Result, StoreRecord};
use storeforge_engine::{ClusteringEngine, ClusteringOutput};
use tracing::debug;

/// Clusters `records` with the configuration in `clustering.toml`, falling
/// back to defaults when the file is missing or unreadable.
pub fn cluster_stores(records: &[StoreRecord]) -> Result<ClusteringOutput> {
    let config = ClusteringConfig::load("clustering.toml").unwrap_or_default();
    cluster_stores_with(records, config)
}

/// Clusters `records` with an explicit configuration.
pub fn cluster_stores_with(
    records: &[StoreRecord],
    config: ClusteringConfig,
) -> Result<ClusteringOutput> {
    #[cfg(feature = "console")]
    storeforge_console::init();

    ClusteringEngine::new(config).run(records)
}

/// Reads a JSON array of store records.
///
/// # Errors
///
/// Returns `InvalidInput` if the file cannot be read or parsed.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<StoreRecord>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ClusteringError::InvalidInput(format!("cannot read {}: {e}", path.display()))
    })?;
    let records: Vec<StoreRecord> = serde_json::from_str(&contents).map_err(|e| {
        ClusteringError::InvalidInput(format!("cannot parse {}: {e}", path.display()))
    })?;
    debug!(event = "records_loaded", path = %path.display(), stores = records.len());
    Ok(records)
}
