//! Persisted manual list.
//!
//! The analyzed manual list (including inferred sections) is stored as a
//! versioned JSON manifest — plain structured records with an explicit
//! version field, so the format can evolve without silently misreading old
//! files. Saves go through a sibling temp file and an atomic rename.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Manual;

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported manifest version {found} (expected {MANIFEST_VERSION})")]
    Version { found: u32 },
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    manuals: Vec<Manual>,
}

/// Load the manual list from `path`.
///
/// Returns `Ok(None)` if the manifest does not exist yet. A manifest with an
/// unknown version is an explicit error, never a partial read.
pub fn load_manifest(path: &Path) -> Result<Option<Vec<Manual>>, StoreError> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let manifest: Manifest = serde_json::from_str(&content)?;
    if manifest.version != MANIFEST_VERSION {
        return Err(StoreError::Version {
            found: manifest.version,
        });
    }
    tracing::info!(path = %path.display(), manuals = manifest.manuals.len(), "manifest loaded");
    Ok(Some(manifest.manuals))
}

/// Save the manual list to `path`, creating parent directories as needed.
pub fn save_manifest(path: &Path, manuals: &[Manual]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let manifest = Manifest {
        version: MANIFEST_VERSION,
        manuals: manuals.to_vec(),
    };
    let content = serde_json::to_string_pretty(&manifest)?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
