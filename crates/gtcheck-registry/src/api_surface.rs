//! Public method names of each mock API, discovered from source text.
//!
//! API files are never imported or executed: every `def <name>(` in a
//! `<Service>Apis.<ext>` file is taken as a method, minus `_`-prefixed ones.

use crate::{LoadFailure, RegistryError, list_dir_sorted};
use gtcheck_kernel::Service;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const API_STEM_SUFFIX: &str = "Apis";

fn method_def_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"def\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*\(").expect("method-def regex must compile")
    })
}

/// Public method names defined in one source text.
pub fn public_methods(source: &str) -> BTreeSet<String> {
    method_def_re()
        .captures_iter(source)
        .filter_map(|captures| captures.get(1))
        .map(|name| name.as_str())
        .filter(|name| !name.starts_with('_'))
        .map(str::to_string)
        .collect()
}

/// Outcome of a method lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodLookup {
    Present,
    Missing,
    /// No API source was discovered for the service.
    NoRegistry,
}

#[derive(Debug, Default)]
pub struct ApiSurfaceRegistry {
    surfaces: BTreeMap<Service, BTreeSet<String>>,
    failures: Vec<LoadFailure>,
}

impl ApiSurfaceRegistry {
    /// Scan `dir` (non-recursively) for `<Service>Apis.<ext>` files.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let dir = dir.as_ref();
        let mut registry = Self::default();
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "API source directory not found");
            return Ok(registry);
        }

        for path in list_dir_sorted(dir)? {
            let Some(stem) = api_stem(&path) else {
                continue;
            };
            let service = Service::from_api_stem(stem);
            match fs::read_to_string(&path) {
                Ok(source) => {
                    let methods = public_methods(&source);
                    tracing::info!(
                        service = %service,
                        methods = methods.len(),
                        "loaded API surface"
                    );
                    registry.surfaces.entry(service).or_default().extend(methods);
                }
                Err(source) => {
                    let error = RegistryError::Io {
                        path: PathBuf::from(&path),
                        source,
                    };
                    tracing::warn!(%error, "skipping API source");
                    registry.failures.push(LoadFailure {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }
        Ok(registry)
    }

    /// Build a registry from in-memory source texts.
    pub fn from_sources<'a>(sources: impl IntoIterator<Item = (Service, &'a str)>) -> Self {
        let mut registry = Self::default();
        for (service, source) in sources {
            registry
                .surfaces
                .entry(service)
                .or_default()
                .extend(public_methods(source));
        }
        registry
    }

    /// Exact, case-sensitive membership test.
    pub fn has_method(&self, service: &Service, name: &str) -> MethodLookup {
        match self.surfaces.get(service) {
            None => MethodLookup::NoRegistry,
            Some(methods) if methods.contains(name) => MethodLookup::Present,
            Some(_) => MethodLookup::Missing,
        }
    }

    pub fn methods(&self, service: &Service) -> Option<&BTreeSet<String>> {
        self.surfaces.get(service)
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.surfaces.keys()
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

fn api_stem(path: &Path) -> Option<&str> {
    path.extension()?;
    let stem = path.file_stem()?.to_str()?;
    (stem.ends_with(API_STEM_SUFFIX) && stem.len() > API_STEM_SUFFIX.len()).then_some(stem)
}
