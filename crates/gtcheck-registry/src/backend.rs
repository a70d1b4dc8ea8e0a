//! Backend fixture snapshots.
//!
//! One `diverse_<service>_state.json` document per service, loaded once and
//! read-only afterwards. The `users` collection and every other top-level
//! collection are normalized into [`EntityIndex`] views at load time.

use crate::entity_index::{CollectionPath, EntityIndex, collection_contains};
use crate::{LoadFailure, RegistryError, list_dir_sorted};
use gtcheck_kernel::Service;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const FIXTURE_PREFIX: &str = "diverse_";
pub const FIXTURE_SUFFIX: &str = "_state.json";
pub const USERS_COLLECTION: &str = "users";

/// One service's fixture document.
#[derive(Debug, Clone)]
pub struct BackendSnapshot {
    service: Service,
    document: Value,
    users: EntityIndex,
    collections: BTreeMap<String, EntityIndex>,
}

impl BackendSnapshot {
    pub fn new(service: Service, document: Value) -> Self {
        let collections: BTreeMap<String, EntityIndex> = document
            .as_object()
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(_, value)| value.is_object() || value.is_array())
                    .map(|(name, value)| (name.clone(), EntityIndex::from_collection(name, value)))
                    .collect()
            })
            .unwrap_or_default();
        let users = collections
            .get(USERS_COLLECTION)
            .cloned()
            .unwrap_or_default();
        Self {
            service,
            document,
            users,
            collections,
        }
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn users(&self) -> &EntityIndex {
        &self.users
    }

    pub fn collection(&self, name: &str) -> Option<&EntityIndex> {
        self.collections.get(name)
    }

    /// Top-level collection names, sorted.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Whether any collection reached by `path` holds `id`.
    pub fn contains(&self, path: &CollectionPath, id: &str) -> bool {
        if let Some(name) = path.top_level() {
            return self
                .collection(name)
                .is_some_and(|index| index.contains(id));
        }
        let name = path.collection_name();
        path.resolve(&self.document)
            .into_iter()
            .any(|collection| collection_contains(name, collection, id))
    }
}

/// Fixture snapshots keyed by service.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    snapshots: BTreeMap<Service, BackendSnapshot>,
    failures: Vec<LoadFailure>,
}

impl BackendRegistry {
    /// Load every `diverse_<service>_state.json` under `dir`. Unreadable or
    /// undecodable fixtures are logged and skipped.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let dir = dir.as_ref();
        let mut registry = Self::default();
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "backend fixture directory not found");
            return Ok(registry);
        }

        for path in list_dir_sorted(dir)? {
            let Some(stem) = fixture_stem(&path) else {
                continue;
            };
            let service = Service::from_fixture_stem(stem);
            match read_document(&path) {
                Ok(document) => {
                    let snapshot = BackendSnapshot::new(service.clone(), document);
                    tracing::info!(
                        service = %service,
                        users = snapshot.users().len(),
                        "loaded backend fixture"
                    );
                    if registry.snapshots.insert(service.clone(), snapshot).is_some() {
                        tracing::warn!(
                            service = %service,
                            path = %path.display(),
                            "fixture replaces an earlier fixture for the same service"
                        );
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "skipping backend fixture");
                    registry.failures.push(LoadFailure {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }
        Ok(registry)
    }

    /// Build a registry from in-memory documents.
    pub fn from_documents(documents: impl IntoIterator<Item = (Service, Value)>) -> Self {
        let snapshots = documents
            .into_iter()
            .map(|(service, document)| (service.clone(), BackendSnapshot::new(service, document)))
            .collect();
        Self {
            snapshots,
            failures: Vec::new(),
        }
    }

    pub fn get(&self, service: &Service) -> Option<&BackendSnapshot> {
        self.snapshots.get(service)
    }

    pub fn user_exists(&self, service: &Service, user_id: &str) -> bool {
        self.user_record(service, user_id).is_some()
    }

    pub fn user_record(&self, service: &Service, user_id: &str) -> Option<&Value> {
        self.get(service)?.users().get(user_id)
    }

    pub fn collection_item_exists(
        &self,
        service: &Service,
        path: &CollectionPath,
        id: &str,
    ) -> bool {
        self.get(service)
            .is_some_and(|snapshot| snapshot.contains(path, id))
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.snapshots.keys()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &BackendSnapshot> {
        self.snapshots.values()
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

fn fixture_stem(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with(FIXTURE_PREFIX) && name.ends_with(FIXTURE_SUFFIX) {
        name.strip_suffix(".json")
    } else {
        None
    }
}

fn read_document(path: &Path) -> Result<Value, RegistryError> {
    let bytes = fs::read(path).map_err(|source| RegistryError::Io {
        path: PathBuf::from(path),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| RegistryError::Json {
        path: PathBuf::from(path),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempDirGuard;
    use serde_json::json;

    fn path(raw: &str) -> CollectionPath {
        raw.parse().expect("path should parse")
    }

    #[test]
    fn load_normalizes_service_keys_and_skips_bad_fixtures() {
        let dir = TempDirGuard::new("backends");
        dir.write(
            "diverse_smart_things_state.json",
            r#"{"users": {"u1": {"name": "Ada"}}}"#,
        );
        dir.write(
            "diverse_amazon_state.json",
            r#"{"users": [{"user_id": "a1"}], "products": [{"product_id": "p1"}]}"#,
        );
        dir.write("diverse_gmail_state.json", "{ not json");
        dir.write("notes.json", r#"{"users": {}}"#);

        let registry = BackendRegistry::load(dir.path()).expect("directory should list");

        assert_eq!(registry.len(), 2);
        assert!(registry.user_exists(&Service::SmartThings, "u1"));
        assert!(registry.user_exists(&Service::from_label("smartthings"), "u1"));
        assert!(registry.user_exists(&Service::Amazon, "a1"));
        assert!(registry.get(&Service::Gmail).is_none());
        assert_eq!(registry.failures().len(), 1);
        assert!(registry.failures()[0].reason.contains("invalid JSON"));
    }

    #[test]
    fn missing_directory_is_an_empty_registry() {
        let dir = TempDirGuard::new("backends-missing");
        let registry =
            BackendRegistry::load(dir.path().join("absent")).expect("missing dir is not an error");
        assert!(registry.is_empty());
    }

    #[test]
    fn user_lookup_matches_only_real_ids() {
        let registry = BackendRegistry::from_documents([
            (Service::Gmail, json!({"users": {"u1": {}}})),
            (Service::X, json!({"users": [{"id": "x1"}, {"user_id": "x2"}]})),
        ]);

        assert!(registry.user_exists(&Service::Gmail, "u1"));
        assert!(!registry.user_exists(&Service::Gmail, "u2"));
        assert!(registry.user_exists(&Service::X, "x1"));
        assert!(registry.user_exists(&Service::X, "x2"));
        assert!(!registry.user_exists(&Service::Slack, "u1"));
    }

    #[test]
    fn collection_lookup_handles_top_level_and_nested_paths() {
        let registry = BackendRegistry::from_documents([(
            Service::YouTube,
            json!({
                "users": {"u1": {"watch_history": ["v1"], "orders": [{"order_id": "o1"}]}},
                "channels": [{"id": "c1", "videos": ["v2"]}]
            }),
        )]);
        let yt = Service::YouTube;

        assert!(registry.collection_item_exists(&yt, &path("channels"), "c1"));
        assert!(!registry.collection_item_exists(&yt, &path("channels"), "c2"));
        assert!(registry.collection_item_exists(&yt, &path("users.*.watch_history"), "v1"));
        assert!(registry.collection_item_exists(&yt, &path("channels.*.videos"), "v2"));
        assert!(registry.collection_item_exists(&yt, &path("users.*.orders"), "o1"));
        assert!(!registry.collection_item_exists(&yt, &path("products"), "p1"));
        assert!(!registry.collection_item_exists(&Service::Amazon, &path("channels"), "c1"));
    }
}
