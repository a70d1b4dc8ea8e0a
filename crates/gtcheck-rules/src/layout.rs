//! Corpus directory layout.

use crate::RulesError;
use gtcheck_registry::{ApiSurfaceRegistry, BackendRegistry};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

pub const PROMPTS_DIR: &str = "Prompts";
pub const COMBINATIONS_DIR: &str = "Combinations";
pub const BACKENDS_DIR: &str = "Backends";

/// Directories derived from one corpus base directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusLayout {
    pub base_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub combinations_dir: PathBuf,
    pub backends_dir: PathBuf,
    /// `<Service>Apis.<ext>` files live directly in the base directory.
    pub api_dir: PathBuf,
}

impl CorpusLayout {
    pub fn from_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let prompts_dir = base_dir.join(PROMPTS_DIR);
        Self {
            combinations_dir: prompts_dir.join(COMBINATIONS_DIR),
            backends_dir: base_dir.join(BACKENDS_DIR),
            api_dir: base_dir.clone(),
            prompts_dir,
            base_dir,
        }
    }

    /// `path` relative to the base directory, `/`-separated.
    pub fn display_path(&self, path: &Path) -> String {
        let Ok(relative) = path.strip_prefix(&self.base_dir) else {
            return path.display().to_string();
        };
        relative
            .components()
            .filter_map(|component| match component {
                Component::CurDir => None,
                other => Some(other.as_os_str().to_string_lossy().into_owned()),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Both registries, loaded once per run.
#[derive(Debug, Default)]
pub struct Registries {
    pub backends: BackendRegistry,
    pub apis: ApiSurfaceRegistry,
}

impl Registries {
    pub fn load(layout: &CorpusLayout) -> Result<Self, RulesError> {
        let backends = BackendRegistry::load(&layout.backends_dir)?;
        let apis = ApiSurfaceRegistry::load(&layout.api_dir)?;
        tracing::info!(
            backends = backends.len(),
            api_surfaces = apis.len(),
            "registries loaded"
        );
        Ok(Self { backends, apis })
    }
}
