//! Canonical id → record view over map- or list-shaped collections.
//!
//! Fixture generators store collections either as id-keyed objects
//! (`"users": {"u1": {...}}`) or as lists of records that carry their own id
//! (`"users": [{"user_id": "u1", ...}]`), and some nested collections are
//! bare id lists (`"watch_history": ["v1", "v2"]`). Every lookup goes through
//! [`collection_entries`], so representation is tested in one place.

use crate::RegistryError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Id fields probed on list records of the collection `name`: the singular
/// `<name>_id` (`users` → `user_id`) followed by plain `id`.
pub fn id_fields(name: &str) -> [String; 2] {
    let singular = name.strip_suffix('s').unwrap_or(name);
    [format!("{singular}_id"), "id".to_string()]
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Every (id, record) pair of a collection. A list record carrying both id
/// fields is yielded once per distinct id.
pub fn collection_entries<'a>(
    name: &str,
    collection: &'a Value,
) -> Box<dyn Iterator<Item = (String, &'a Value)> + 'a> {
    match collection {
        Value::Object(map) => Box::new(map.iter().map(|(key, record)| (key.clone(), record))),
        Value::Array(items) => {
            let fields = id_fields(name);
            Box::new(items.iter().flat_map(move |item| {
                let ids: Vec<String> = match item {
                    Value::Object(record) => {
                        let mut ids: Vec<String> = Vec::with_capacity(2);
                        for field in &fields {
                            if let Some(id) = record.get(field).and_then(id_text)
                                && !ids.contains(&id)
                            {
                                ids.push(id);
                            }
                        }
                        ids
                    }
                    other => id_text(other).into_iter().collect(),
                };
                ids.into_iter().map(move |id| (id, item))
            }))
        }
        _ => Box::new(std::iter::empty()),
    }
}

/// Whether the collection `name` holds an entity with this id.
pub fn collection_contains(name: &str, collection: &Value, id: &str) -> bool {
    collection_entries(name, collection).any(|(key, _)| key == id)
}

fn collection_member<'a>(name: &str, collection: &'a Value, id: &str) -> Option<&'a Value> {
    collection_entries(name, collection).find_map(|(key, record)| (key == id).then_some(record))
}

/// A collection normalized at load time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityIndex {
    records: BTreeMap<String, Value>,
}

impl EntityIndex {
    pub fn from_collection(name: &str, collection: &Value) -> Self {
        let mut records = BTreeMap::new();
        for (id, record) in collection_entries(name, collection) {
            records.entry(id).or_insert_with(|| record.clone());
        }
        Self { records }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.records.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One step of a [`CollectionPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object field.
    Key(String),
    /// Every member of the current map or list.
    Each,
    /// The member whose id is this value.
    Member(String),
    /// The member whose id is the n-th positional call argument, unbound.
    Arg(usize),
}

/// Dotted path into a snapshot: `products`, `users.*.orders`,
/// `users.$0.gmail_data.messages`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPath {
    segments: Vec<PathSegment>,
}

impl CollectionPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Name of the collection the path ends in.
    pub fn collection_name(&self) -> &str {
        self.segments
            .iter()
            .rev()
            .find_map(|segment| match segment {
                PathSegment::Key(name) => Some(name.as_str()),
                _ => None,
            })
            .unwrap_or("")
    }

    pub fn is_bound(&self) -> bool {
        !self
            .segments
            .iter()
            .any(|segment| matches!(segment, PathSegment::Arg(_)))
    }

    /// Replace `$n` segments with members named by call arguments. Returns
    /// `None` if a referenced argument is absent or not id-shaped.
    pub fn bind(&self, args: &[Option<String>]) -> Option<Self> {
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment {
                PathSegment::Arg(index) => args
                    .get(*index)
                    .cloned()
                    .flatten()
                    .map(PathSegment::Member),
                other => Some(other.clone()),
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { segments })
    }

    /// Single top-level key, answerable from the load-time index.
    pub fn top_level(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [PathSegment::Key(name)] => Some(name.as_str()),
            _ => None,
        }
    }

    /// Every collection value the path reaches in `root`. `*` visits every
    /// member, id-bearing or not; unbound `$n` segments reach nothing.
    pub fn resolve<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut frontier: Vec<(&str, &'a Value)> = vec![("", root)];
        for segment in &self.segments {
            let mut next = Vec::new();
            for (name, value) in frontier {
                match segment {
                    PathSegment::Key(key) => {
                        if let Some(child) = value.get(key) {
                            next.push((key.as_str(), child));
                        }
                    }
                    PathSegment::Each => match value {
                        Value::Object(map) => {
                            next.extend(map.values().map(|member| (name, member)))
                        }
                        Value::Array(items) => {
                            next.extend(items.iter().map(|member| (name, member)))
                        }
                        _ => {}
                    },
                    PathSegment::Member(id) => {
                        if let Some(member) = collection_member(name, value, id) {
                            next.push((name, member));
                        }
                    }
                    PathSegment::Arg(_) => {}
                }
            }
            frontier = next;
        }
        frontier.into_iter().map(|(_, value)| value).collect()
    }
}

impl FromStr for CollectionPath {
    type Err = RegistryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RegistryError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };
        if raw.trim().is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            let segment = match part {
                "" => return Err(invalid("empty segment")),
                "*" => PathSegment::Each,
                _ => match part.strip_prefix('$') {
                    Some(index) => PathSegment::Arg(
                        index
                            .parse()
                            .map_err(|_| invalid("`$` must be followed by an argument index"))?,
                    ),
                    None => PathSegment::Key(part.to_string()),
                },
            };
            segments.push(segment);
        }
        if !matches!(segments.first(), Some(PathSegment::Key(_))) {
            return Err(invalid("path must start with a collection name"));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .segments
            .iter()
            .map(|segment| match segment {
                PathSegment::Key(key) | PathSegment::Member(key) => key.clone(),
                PathSegment::Each => "*".to_string(),
                PathSegment::Arg(index) => format!("${index}"),
            })
            .collect();
        f.write_str(&rendered.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> CollectionPath {
        raw.parse().expect("path should parse")
    }

    #[test]
    fn map_and_list_forms_index_the_same_ids() {
        let as_map = json!({"u1": {"name": "Ada"}, "u2": {"name": "Bo"}});
        let as_list = json!([{"user_id": "u1", "name": "Ada"}, {"id": "u2", "name": "Bo"}]);

        let map_index = EntityIndex::from_collection("users", &as_map);
        let list_index = EntityIndex::from_collection("users", &as_list);

        assert_eq!(map_index.ids().collect::<Vec<_>>(), vec!["u1", "u2"]);
        assert_eq!(list_index.ids().collect::<Vec<_>>(), vec!["u1", "u2"]);
        assert_eq!(list_index.get("u1").and_then(|r| r["name"].as_str()), Some("Ada"));
    }

    #[test]
    fn list_records_only_match_their_collection_id_fields() {
        let users = json!([{"user_id": "u1", "product_id": "p9"}]);
        assert!(collection_contains("users", &users, "u1"));
        assert!(!collection_contains("users", &users, "p9"));

        let products = json!([{"product_id": "p9"}, {"id": 42}]);
        assert!(collection_contains("products", &products, "p9"));
        assert!(collection_contains("products", &products, "42"));
    }

    #[test]
    fn bare_id_lists_and_scalars() {
        let history = json!(["v1", "v2"]);
        assert!(collection_contains("watch_history", &history, "v2"));
        assert!(!collection_contains("watch_history", &json!("v1"), "v1"));
        assert!(EntityIndex::from_collection("x", &json!(null)).is_empty());
    }

    #[test]
    fn path_parsing_and_display() {
        let parsed = path("users.$0.gmail_data.messages");
        assert_eq!(
            parsed.segments(),
            &[
                PathSegment::Key("users".into()),
                PathSegment::Arg(0),
                PathSegment::Key("gmail_data".into()),
                PathSegment::Key("messages".into()),
            ]
        );
        assert_eq!(parsed.to_string(), "users.$0.gmail_data.messages");
        assert_eq!(parsed.collection_name(), "messages");
        assert!(!parsed.is_bound());
        assert_eq!(path("products").top_level(), Some("products"));

        assert!("".parse::<CollectionPath>().is_err());
        assert!("users..orders".parse::<CollectionPath>().is_err());
        assert!("*.orders".parse::<CollectionPath>().is_err());
        assert!("users.$x".parse::<CollectionPath>().is_err());
    }

    #[test]
    fn resolve_walks_members_of_either_shape() {
        let doc = json!({
            "users": [
                {"user_id": "u1", "orders": [{"order_id": "o1"}]},
                {"user_id": "u2", "orders": {"o2": {}}}
            ],
            "channels": {"c1": {"videos": ["v1"]}}
        });

        let orders = path("users.*.orders").resolve(&doc);
        assert_eq!(orders.len(), 2);
        assert!(collection_contains("orders", orders[0], "o1"));
        assert!(collection_contains("orders", orders[1], "o2"));

        let bound = path("users.$0.orders")
            .bind(&[Some("u2".to_string())])
            .expect("argument should bind");
        assert!(bound.is_bound());
        assert_eq!(bound.resolve(&doc).len(), 1);

        assert!(path("users.$1.orders").bind(&[Some("u2".into())]).is_none());
        assert!(path("users.$0.orders").resolve(&doc).is_empty());
        assert_eq!(path("channels.*.videos").resolve(&doc).len(), 1);
        assert!(path("missing.*").resolve(&doc).is_empty());
    }
}
