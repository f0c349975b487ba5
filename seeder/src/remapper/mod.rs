//! Identifier remapping.
//!
//! The [`IdRemapper`] owns the mapping from original (placeholder) ids to
//! canonical ids for a single run. Original ids are only unique within their
//! collection, so every entry is keyed by collection and original id. The
//! mapping is append-only and one-to-one: once an original id is mapped, it
//! keeps its canonical id until the run ends. Canonical ids either come from
//! the record store (`bind`) or are allocated locally (`resolve`).
//!
//! The remapper is passed explicitly to every stage that needs it.

mod generator;

pub use generator::{CanonicalIdGenerator, RANDOM_ID_LEN};

use std::collections::{HashMap, HashSet};

use seeder_shared::{EntityRecord, ReferenceField, ReferenceValue};
use serde_json::Value;
use tracing::debug;

use crate::errors::RemapError;

/// How `rewrite_references` treats ids that have no mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// Drop ids that are not bound in the field's target collection.
    Strict,
    /// Keep unmapped ids as they are.
    Lenient,
    /// Allocate a canonical id for every unmapped id.
    Allocate,
}

/// A reference removed by a rewrite.
///
/// `reference` is the id, or the JSON text of an element that was not an id
/// at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedReference {
    pub field: String,
    pub reference: String,
}

/// Result of rewriting one record's reference fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Number of references written back.
    pub kept: usize,
    /// References removed because they had no mapping.
    pub dropped: Vec<DroppedReference>,
}

/// Whether `value` holds at least one non-empty id.
pub fn holds_references(value: &Value) -> bool {
    ReferenceValue::from_value(value).is_some_and(|reference| !reference.is_empty())
}

/// Placeholder to canonical id mapping for one run.
#[derive(Debug, Default)]
pub struct IdRemapper {
    generator: CanonicalIdGenerator,
    allocated: u64,
    /// collection -> original -> canonical
    forward: HashMap<String, HashMap<String, String>>,
    /// canonical -> (collection, original)
    owners: HashMap<String, (String, String)>,
    /// collection -> canonical ids, in binding order
    known: HashMap<String, Vec<String>>,
    membership: HashMap<String, HashSet<String>>,
}

impl IdRemapper {
    pub fn new(generator: CanonicalIdGenerator) -> Self {
        Self {
            generator,
            ..Self::default()
        }
    }

    /// Return the canonical id for `original` in `collection`, allocating
    /// one if needed.
    ///
    /// Repeated calls with the same pair return the same canonical id.
    pub fn resolve(&mut self, collection: &str, original: &str) -> String {
        if let Some(canonical) = self.lookup(collection, original) {
            return canonical.to_string();
        }

        let canonical = self.allocate();
        self.insert(collection, original, &canonical);
        debug!(
            collection = %collection,
            original = %original,
            canonical = %canonical,
            "Allocated canonical id"
        );
        canonical
    }

    fn allocate(&mut self) -> String {
        loop {
            self.allocated += 1;
            let candidate = self.generator.generate(self.allocated);
            let is_original = self
                .forward
                .values()
                .any(|originals| originals.contains_key(&candidate));
            if !self.owners.contains_key(&candidate) && !is_original {
                return candidate;
            }
            debug!(candidate = %candidate, "Canonical id already in use, regenerating");
        }
    }

    fn insert(&mut self, collection: &str, original: &str, canonical: &str) {
        self.forward
            .entry(collection.to_string())
            .or_default()
            .insert(original.to_string(), canonical.to_string());
        self.owners.insert(
            canonical.to_string(),
            (collection.to_string(), original.to_string()),
        );
    }

    /// Record that `original` in `collection` is known to the store as
    /// `canonical`.
    ///
    /// Binding the same pair again is a no-op. Binding a different canonical
    /// id to a mapped original, or reusing a canonical id for another
    /// original, is rejected.
    pub fn bind(
        &mut self,
        collection: &str,
        original: &str,
        canonical: &str,
    ) -> Result<(), RemapError> {
        match self.lookup(collection, original) {
            Some(existing) if existing != canonical => {
                return Err(RemapError::MappingConflict {
                    collection: collection.to_string(),
                    original: original.to_string(),
                    existing: existing.to_string(),
                    attempted: canonical.to_string(),
                });
            }
            Some(_) => {}
            None => {
                if let Some((owner_collection, owner)) = self.owners.get(canonical) {
                    return Err(RemapError::CanonicalConflict {
                        canonical: canonical.to_string(),
                        owner: format!("{}/{}", owner_collection, owner),
                        original: format!("{}/{}", collection, original),
                    });
                }
                self.insert(collection, original, canonical);
            }
        }

        let members = self.membership.entry(collection.to_string()).or_default();
        if members.insert(canonical.to_string()) {
            self.known
                .entry(collection.to_string())
                .or_default()
                .push(canonical.to_string());
        }
        Ok(())
    }

    /// Canonical id for `original` in `collection` without allocating.
    pub fn lookup(&self, collection: &str, original: &str) -> Option<&str> {
        self.forward
            .get(collection)
            .and_then(|originals| originals.get(original))
            .map(String::as_str)
    }

    /// Canonical id for `original`, only if it was bound in `collection`.
    ///
    /// Ids allocated by `resolve` but never bound do not count.
    pub fn resolve_known(&self, collection: &str, original: &str) -> Option<&str> {
        self.lookup(collection, original)
            .filter(|canonical| self.is_known(collection, canonical))
    }

    /// Canonical ids bound in `collection`, in binding order.
    pub fn known_ids(&self, collection: &str) -> &[String] {
        self.known
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_known(&self, collection: &str, canonical: &str) -> bool {
        self.membership
            .get(collection)
            .is_some_and(|members| members.contains(canonical))
    }

    /// Number of mapped original ids across all collections.
    pub fn len(&self) -> usize {
        self.forward.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace every id in the given reference fields with its canonical id
    /// in the field's target collection.
    ///
    /// Absent and null fields are left alone, as are empty strings. In strict
    /// mode a single reference that does not resolve is removed from the
    /// record, and lists lose their unresolved elements. Elements that are
    /// not strings are dropped in strict mode and kept otherwise.
    pub fn rewrite_references<'a>(
        &mut self,
        record: &mut EntityRecord,
        fields: impl IntoIterator<Item = &'a ReferenceField>,
        mode: RewriteMode,
    ) -> RewriteOutcome {
        let mut outcome = RewriteOutcome::default();

        for field in fields {
            let Some(value) = record.get(&field.name).cloned() else {
                continue;
            };
            let mut dropped = Vec::new();

            match value {
                Value::Null => {}
                Value::String(id) if id.is_empty() => {}
                Value::String(id) => match self.map_id(&field.target, &id, mode) {
                    Some(canonical) => {
                        outcome.kept += 1;
                        record.insert(field.name.clone(), Value::String(canonical));
                    }
                    None => {
                        record.remove(&field.name);
                        dropped.push(id);
                    }
                },
                Value::Array(items) => {
                    let mut mapped = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::String(id) if id.is_empty() => {}
                            Value::String(id) => match self.map_id(&field.target, &id, mode) {
                                Some(canonical) => mapped.push(Value::String(canonical)),
                                None => dropped.push(id),
                            },
                            other if mode == RewriteMode::Strict => {
                                dropped.push(other.to_string())
                            }
                            other => mapped.push(other),
                        }
                    }
                    outcome.kept += mapped.iter().filter(|item| item.is_string()).count();
                    record.insert(field.name.clone(), Value::Array(mapped));
                }
                other if mode == RewriteMode::Strict => {
                    record.remove(&field.name);
                    dropped.push(other.to_string());
                }
                _ => {}
            }

            outcome
                .dropped
                .extend(dropped.into_iter().map(|reference| DroppedReference {
                    field: field.name.clone(),
                    reference,
                }));
        }

        outcome
    }

    fn map_id(&mut self, target: &str, id: &str, mode: RewriteMode) -> Option<String> {
        match mode {
            RewriteMode::Strict => self.resolve_known(target, id).map(str::to_string),
            RewriteMode::Lenient => Some(self.lookup(target, id).unwrap_or(id).to_string()),
            RewriteMode::Allocate => Some(self.resolve(target, id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> EntityRecord {
        EntityRecord::try_from(value).unwrap()
    }

    #[test]
    fn test_resolve_is_stable() {
        let mut remapper = IdRemapper::new(CanonicalIdGenerator::random());
        let first = remapper.resolve("users", "user000000000001");
        let again = remapper.resolve("users", "user000000000001");
        let other = remapper.resolve("users", "user000000000002");

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(first.len(), RANDOM_ID_LEN);
        assert_eq!(remapper.len(), 2);
    }

    #[test]
    fn test_resolve_is_scoped_by_collection() {
        let mut remapper = IdRemapper::new(CanonicalIdGenerator::sequential("x"));
        let user = remapper.resolve("users", "1");
        let model = remapper.resolve("models", "1");

        assert_ne!(user, model);
        assert_eq!(remapper.lookup("users", "1"), Some(user.as_str()));
        assert_eq!(remapper.lookup("models", "1"), Some(model.as_str()));
        assert_eq!(remapper.lookup("profiles", "1"), None);
    }

    #[test]
    fn test_resolve_skips_ids_in_use() {
        let mut remapper = IdRemapper::new(CanonicalIdGenerator::sequential("p"));
        remapper
            .bind("projects", "legacy", "p000000000001")
            .unwrap();

        assert_eq!(remapper.resolve("projects", "fresh"), "p000000000002");
    }

    #[test]
    fn test_bind_is_append_only() {
        let mut remapper = IdRemapper::default();
        remapper.bind("users", "u1", "S1").unwrap();
        remapper.bind("users", "u1", "S1").unwrap();

        assert!(matches!(
            remapper.bind("users", "u1", "S2"),
            Err(RemapError::MappingConflict { .. })
        ));
        assert!(matches!(
            remapper.bind("users", "u2", "S1"),
            Err(RemapError::CanonicalConflict { .. })
        ));
        assert!(matches!(
            remapper.bind("models", "u1", "S1"),
            Err(RemapError::CanonicalConflict { .. })
        ));
        assert_eq!(remapper.lookup("users", "u1"), Some("S1"));
        assert_eq!(remapper.known_ids("users"), &["S1".to_string()]);
    }

    #[test]
    fn test_same_original_in_two_collections() {
        let mut remapper = IdRemapper::default();
        remapper.bind("users", "1", "S1").unwrap();
        remapper.bind("models", "1", "S2").unwrap();

        assert_eq!(remapper.resolve_known("users", "1"), Some("S1"));
        assert_eq!(remapper.resolve_known("models", "1"), Some("S2"));
        assert_eq!(remapper.len(), 2);
    }

    #[test]
    fn test_known_ids_by_collection() {
        let mut remapper = IdRemapper::default();
        remapper.bind("users", "u2", "S2").unwrap();
        remapper.bind("users", "u1", "S1").unwrap();
        remapper.bind("models", "m1", "S3").unwrap();

        assert_eq!(remapper.known_ids("users"), &["S2".to_string(), "S1".to_string()]);
        assert!(remapper.is_known("models", "S3"));
        assert!(!remapper.is_known("users", "S3"));
        assert!(remapper.known_ids("profiles").is_empty());

        assert_eq!(remapper.resolve_known("users", "u1"), Some("S1"));
        assert_eq!(remapper.resolve_known("users", "m1"), None);

        remapper.resolve("users", "u7");
        assert_eq!(remapper.resolve_known("users", "u7"), None);
    }

    #[test]
    fn test_strict_rewrite_drops_unmapped() {
        let mut remapper = IdRemapper::default();
        remapper.bind("users", "u1", "S1").unwrap();
        remapper.bind("users", "u2", "S2").unwrap();
        remapper.bind("models", "u9", "S3").unwrap();

        let mut profile = record(json!({
            "id": "p1",
            "user": "u9",
            "friends": ["u2", "u9", "u1"],
            "bio": "hello"
        }));
        let fields = [
            ReferenceField::direct("user", "users"),
            ReferenceField::direct("friends", "users"),
        ];
        let outcome = remapper.rewrite_references(&mut profile, &fields, RewriteMode::Strict);

        assert_eq!(profile.get("user"), None);
        assert_eq!(profile.get("friends"), Some(&json!(["S2", "S1"])));
        assert_eq!(profile.get("bio"), Some(&json!("hello")));
        assert_eq!(outcome.kept, 2);
        assert_eq!(outcome.dropped.len(), 2);
        assert_eq!(outcome.dropped[0].field, "user");
        assert_eq!(outcome.dropped[0].reference, "u9");
    }

    #[test]
    fn test_strict_rewrite_reports_non_string_elements() {
        let mut remapper = IdRemapper::default();
        remapper.bind("models", "m1", "S1").unwrap();

        let mut project = record(json!({"related_models": ["m1", null, 7], "owner": 3}));
        let fields = [
            ReferenceField::direct("related_models", "models"),
            ReferenceField::direct("owner", "users"),
        ];
        let outcome = remapper.rewrite_references(&mut project, &fields, RewriteMode::Strict);

        assert_eq!(project.get("related_models"), Some(&json!(["S1"])));
        assert_eq!(project.get("owner"), None);
        assert_eq!(outcome.kept, 1);
        let dropped: Vec<&str> = outcome.dropped.iter().map(|d| d.reference.as_str()).collect();
        assert_eq!(dropped, vec!["null", "7", "3"]);
    }

    #[test]
    fn test_lenient_rewrite_keeps_unmapped() {
        let mut remapper = IdRemapper::default();
        remapper.bind("models", "m1", "S5").unwrap();

        let mut project = record(json!({"related_models": ["m1", "m7", null]}));
        let outcome = remapper.rewrite_references(
            &mut project,
            &[ReferenceField::direct("related_models", "models")],
            RewriteMode::Lenient,
        );

        assert_eq!(project.get("related_models"), Some(&json!(["S5", "m7", null])));
        assert!(outcome.dropped.is_empty());
    }

    #[test]
    fn test_allocate_rewrite_matches_resolve() {
        let mut remapper = IdRemapper::new(CanonicalIdGenerator::sequential("x"));
        let mut project = record(json!({"owner": "u1", "related": ["m1", "u1"]}));
        let fields = [
            ReferenceField::direct("owner", "users"),
            ReferenceField::direct("related", "models"),
        ];

        remapper.rewrite_references(&mut project, &fields, RewriteMode::Allocate);

        let owner = remapper.resolve("users", "u1");
        let model = remapper.resolve("models", "m1");
        let model_u1 = remapper.resolve("models", "u1");
        assert_ne!(owner, model_u1);
        assert_eq!(project.get("owner"), Some(&json!(owner)));
        assert_eq!(project.get("related"), Some(&json!([model, model_u1])));
    }
}
