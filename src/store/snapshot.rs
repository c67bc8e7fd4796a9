/// Loading store exports from JSON snapshot files
use std::path::Path;

use log::{debug, warn};
use serde_json::Value;

use super::memory::Tree;
use crate::error::StoreError;

/// Parse a snapshot document shaped `{ "<date>": { "<time>": <sample> } }`
///
/// Buckets that are not objects are skipped with a warning rather than
/// failing the whole load.
pub fn parse_snapshot(document: Value) -> Result<Tree, StoreError> {
    let Value::Object(buckets) = document else {
        return Err(StoreError::Malformed(
            "snapshot root must be an object of date buckets".into(),
        ));
    };

    let mut tree = Tree::new();
    for (date, samples) in buckets {
        match samples {
            Value::Object(samples) => {
                tree.insert(date, samples.into_iter().collect());
            }
            other => warn!("Skipping bucket {}: expected object, got {}", date, other),
        }
    }
    Ok(tree)
}

/// Read and parse a snapshot file
pub async fn load_snapshot(path: &Path) -> Result<Tree, StoreError> {
    let raw = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let document: Value =
        serde_json::from_slice(&raw).map_err(|e| StoreError::Malformed(e.to_string()))?;

    let tree = parse_snapshot(document)?;
    debug!(
        "Loaded snapshot {} with {} buckets",
        path.display(),
        tree.len()
    );
    Ok(tree)
}
