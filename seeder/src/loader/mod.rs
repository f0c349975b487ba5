//! Loader module for the seeder.
//!
//! Reads raw entity collections from a [`CollectionSource`] and prepares them
//! for insertion: placeholder ids for records that have none and removal of
//! fields that are never sent to the store.

mod json_directory;
mod memory;

pub use json_directory::JsonDirectorySource;
pub use memory::InMemorySource;

use std::collections::HashSet;

use async_trait::async_trait;
use seeder_shared::{CollectionSpec, EntityCollection, ID_FIELD};
use serde_json::Value;
use tracing::debug;

use crate::errors::LoadError;

/// Source of raw entity collections.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Load the named collection.
    ///
    /// # Returns
    ///
    /// * `Ok(EntityCollection)` - The records in source order
    /// * `Err(LoadError::SourceNotFound)` - If the source has no such collection
    /// * `Err(LoadError::MalformedRecord)` - If a record is not a key/value object
    async fn load(&self, collection: &str) -> Result<EntityCollection, LoadError>;
}

/// Give every record without an id the placeholder `{prefix}{index+1:012}`.
///
/// Records must end up with a non-empty string id that is unique within the
/// collection. A missing id without a configured prefix, a non-string id or
/// a duplicate id is a malformed record.
pub fn assign_placeholder_ids(
    collection: &mut EntityCollection,
    spec: &CollectionSpec,
) -> Result<(), LoadError> {
    let name = collection.name().to_string();
    let mut seen = HashSet::new();
    let mut assigned = 0usize;

    for (index, record) in collection.records_mut().iter_mut().enumerate() {
        let id = match record.get(ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            None | Some(Value::String(_)) | Some(Value::Null) => match &spec.placeholder_prefix {
                Some(prefix) => {
                    let id = format!("{}{:012}", prefix, index + 1);
                    record.set_id(id.clone());
                    assigned += 1;
                    id
                }
                None => return Err(LoadError::malformed(&name, index, "record has no id")),
            },
            Some(other) => {
                return Err(LoadError::malformed(
                    &name,
                    index,
                    format!("id must be a string, found {}", other),
                ));
            }
        };

        if !seen.insert(id.clone()) {
            return Err(LoadError::malformed(
                &name,
                index,
                format!("duplicate id {}", id),
            ));
        }
    }

    if assigned > 0 {
        debug!(collection = %name, assigned, "Assigned placeholder ids");
    }
    Ok(())
}

/// Prepare a freshly loaded collection for insertion.
pub fn prepare_collection(
    mut collection: EntityCollection,
    spec: &CollectionSpec,
) -> Result<EntityCollection, LoadError> {
    assign_placeholder_ids(&mut collection, spec)?;

    if !spec.omit_fields.is_empty() {
        for record in collection.records_mut() {
            for field in &spec.omit_fields {
                record.remove(field);
            }
        }
    }

    Ok(collection)
}

/// Turn a parsed JSON document into a collection.
///
/// The document must be an array of objects.
pub(crate) fn collection_from_value(
    collection: &str,
    value: Value,
) -> Result<EntityCollection, LoadError> {
    let Value::Array(items) = value else {
        return Err(LoadError::json(
            collection,
            "expected a JSON array of records",
        ));
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            seeder_shared::EntityRecord::try_from(item).map_err(|item| {
                LoadError::malformed(
                    collection,
                    index,
                    format!("expected an object, found {}", item),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EntityCollection::new(collection, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use seeder_shared::EntityRecord;
    use serde_json::json;

    fn users(values: Vec<Value>) -> EntityCollection {
        EntityCollection::new(
            "users",
            values
                .into_iter()
                .map(|v| EntityRecord::try_from(v).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_placeholder_ids_for_missing_ids() {
        let spec = CollectionSpec::new("users").with_placeholder_prefix("user");
        let mut collection = users(vec![
            json!({"email": "a@example.com"}),
            json!({"id": "keep-me", "email": "b@example.com"}),
            json!({"id": "", "email": "c@example.com"}),
        ]);

        assign_placeholder_ids(&mut collection, &spec).unwrap();

        assert_eq!(
            collection.ids(),
            vec!["user000000000001", "keep-me", "user000000000003"]
        );
    }

    #[test]
    fn test_missing_id_without_prefix() {
        let spec = CollectionSpec::new("users");
        let mut collection = users(vec![json!({"id": "u1"}), json!({"email": "x"})]);

        let err = assign_placeholder_ids(&mut collection, &spec).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRecord { index: 1, .. }));
    }

    #[test]
    fn test_non_string_id_is_malformed() {
        let spec = CollectionSpec::new("users").with_placeholder_prefix("user");
        let mut collection = users(vec![json!({"id": 7})]);

        let err = assign_placeholder_ids(&mut collection, &spec).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRecord { index: 0, .. }));
    }

    #[test]
    fn test_duplicate_id_is_malformed() {
        let spec = CollectionSpec::new("users");
        let mut collection = users(vec![json!({"id": "u1"}), json!({"id": "u1"})]);

        let err = assign_placeholder_ids(&mut collection, &spec).unwrap_err();
        assert!(err.to_string().contains("duplicate id u1"));
    }

    #[test]
    fn test_prepare_omits_fields() {
        let spec = CollectionSpec::new("users")
            .with_placeholder_prefix("user")
            .with_omitted("profile_picture");
        let collection = users(vec![json!({
            "email": "a@example.com",
            "profile_picture": "avatar.png"
        })]);

        let prepared = prepare_collection(collection, &spec).unwrap();
        let record = &prepared.records()[0];

        assert!(!record.contains("profile_picture"));
        assert_eq!(record.get("email"), Some(&json!("a@example.com")));
        assert_eq!(record.id(), Some("user000000000001"));
    }

    #[test]
    fn test_collection_from_value_rejects_non_objects() {
        let err = collection_from_value("models", json!([{"id": "m1"}, "m2"])).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRecord { index: 1, .. }));

        let err = collection_from_value("models", json!({"id": "m1"})).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }
}
