//! # gtcheck-registry
//!
//! Read-only registries built once at startup:
//! - `BackendRegistry`: per-service fixture snapshots with normalized
//!   id → record views
//! - `ApiSurfaceRegistry`: per-service public method names scanned from
//!   API source text
//!
//! ## Data model
//!
//! ```text
//! Backends/diverse_<service>_state.json ──load──▶ BackendSnapshot
//!                                                   ├─ users: EntityIndex
//!                                                   └─ collections: name → EntityIndex
//! <Service>Apis.<ext> ──regex `def name(`──▶ Service → {method names}
//! ```
//!
//! Per-file failures are logged and kept as [`LoadFailure`]s; they never
//! abort a load.

pub mod api_surface;
pub mod backend;
pub mod entity_index;

pub use api_surface::{ApiSurfaceRegistry, MethodLookup, public_methods};
pub use backend::{BackendRegistry, BackendSnapshot};
pub use entity_index::{CollectionPath, EntityIndex, PathSegment, collection_contains};

use std::fs;
use std::path::{Path, PathBuf};

/// Errors from registry loading.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{}: I/O error: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: invalid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid collection path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
}

/// A fixture or API source that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Regular files directly under `dir`, sorted by path.
pub(crate) fn list_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    let io_error = |source| RegistryError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
