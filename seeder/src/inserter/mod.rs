//! Dependency-ordered record creation.
//!
//! Records are created one at a time in collection order. Reference fields
//! are stripped from the create payload because their targets may not exist
//! yet; the stripped values are kept so the reconciler can restore them once
//! every collection has been inserted.

use std::iter;

use seeder_repository::RecordStore;
use seeder_shared::{CollectionSpec, EntityCollection, EntityRecord, SelfReferencePolicy, ID_FIELD};
use tracing::{debug, info, instrument, warn};

use crate::remapper::{holds_references, IdRemapper, RewriteMode};
use crate::report::{FailureStage, RecordFailure};

/// Reference fields stripped from one inserted record.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLinks {
    pub original_id: String,
    pub canonical_id: String,
    /// The stripped fields with their original values.
    pub fields: EntityRecord,
}

/// Result of inserting one collection.
#[derive(Debug, Clone, Default)]
pub struct InsertOutcome {
    pub collection: String,
    pub attempted: usize,
    /// Original id and store-assigned id for every created record, in order.
    pub assigned: Vec<(String, String)>,
    /// Stripped references of every created record, in order.
    pub pending: Vec<PendingLinks>,
    pub failures: Vec<RecordFailure>,
}

impl InsertOutcome {
    pub fn assigned_id(&self, original: &str) -> Option<&str> {
        self.assigned
            .iter()
            .find(|(o, _)| o == original)
            .map(|(_, assigned)| assigned.as_str())
    }
}

/// Insert every record of `collection` into the store.
///
/// Store failures are recorded in the outcome and do not stop the batch.
/// Successfully created records are bound in `remapper` under `spec.name`.
#[instrument(skip_all, fields(collection = %spec.name, records = collection.len()))]
pub async fn insert_collection(
    store: &dyn RecordStore,
    remapper: &mut IdRemapper,
    spec: &CollectionSpec,
    collection: &EntityCollection,
) -> InsertOutcome {
    let mut outcome = InsertOutcome {
        collection: spec.name.clone(),
        ..InsertOutcome::default()
    };

    info!(collection = %spec.name, records = collection.len(), "Inserting collection");

    for record in collection {
        outcome.attempted += 1;
        let original_id = record.id().unwrap_or_default().to_string();
        let (payload, stripped) = strip_references(record, spec, remapper);

        let created = match store.create(&spec.name, &payload).await {
            Ok(created) => created,
            Err(e) => {
                warn!(
                    collection = %spec.name,
                    record_id = %original_id,
                    error = %e,
                    "Failed to insert record"
                );
                outcome.failures.push(RecordFailure {
                    collection: spec.name.clone(),
                    record_id: original_id,
                    stage: FailureStage::Insert,
                    detail: e.to_string(),
                });
                continue;
            }
        };

        if let Err(e) = remapper.bind(&spec.name, &original_id, &created.id) {
            warn!(
                collection = %spec.name,
                record_id = %original_id,
                assigned_id = %created.id,
                error = %e,
                "Inserted record could not be mapped"
            );
            outcome.failures.push(RecordFailure {
                collection: spec.name.clone(),
                record_id: original_id,
                stage: FailureStage::Insert,
                detail: e.to_string(),
            });
            continue;
        }

        debug!(
            collection = %spec.name,
            record_id = %original_id,
            assigned_id = %created.id,
            "Inserted record"
        );
        outcome
            .assigned
            .push((original_id.clone(), created.id.clone()));
        outcome.pending.push(PendingLinks {
            original_id,
            canonical_id: created.id,
            fields: stripped,
        });
    }

    info!(
        collection = %spec.name,
        inserted = outcome.assigned.len(),
        failed = outcome.failures.len(),
        "Collection inserted"
    );
    outcome
}

/// Split a record into its create payload and the reference fields held back.
fn strip_references(
    record: &EntityRecord,
    spec: &CollectionSpec,
    remapper: &mut IdRemapper,
) -> (EntityRecord, EntityRecord) {
    let mut payload = record.clone();
    let mut stripped = EntityRecord::new();

    for field in &spec.references {
        let Some(value) = payload.remove(&field.name) else {
            continue;
        };

        let send_known = spec.is_self_reference(field)
            && !field.is_synthetic()
            && spec.self_references == SelfReferencePolicy::ResolveKnown;
        if send_known {
            let mut known = EntityRecord::new();
            known.insert(field.name.clone(), value.clone());
            remapper.rewrite_references(&mut known, iter::once(field), RewriteMode::Strict);
            if let Some(resolved) = known.remove(&field.name).filter(holds_references) {
                payload.insert(field.name.clone(), resolved);
            }
        }

        stripped.insert(field.name.clone(), value);
    }

    if !spec.send_original_id {
        payload.remove(ID_FIELD);
    }

    (payload, stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seeder_repository::{Credentials, MockRecordStore};
    use seeder_shared::ReferenceField;
    use serde_json::json;

    fn collection(name: &str, values: Vec<serde_json::Value>) -> EntityCollection {
        EntityCollection::new(
            name,
            values
                .into_iter()
                .map(|v| EntityRecord::try_from(v).unwrap())
                .collect(),
        )
    }

    async fn store() -> MockRecordStore {
        let store = MockRecordStore::new();
        store
            .authenticate(&Credentials::new("admin", "secret"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_strips_references_and_binds_ids() {
        let store = store().await;
        let mut remapper = IdRemapper::default();
        let spec = CollectionSpec::new("research_projects")
            .with_reference(ReferenceField::direct("collaborators", "users"))
            .with_reference(ReferenceField::direct("related_models", "models"));
        let projects = collection(
            "research_projects",
            vec![json!({
                "id": "project000000000001",
                "title": "Protein folding",
                "collaborators": ["u1"],
                "related_models": ["model000000000001"]
            })],
        );

        let outcome = insert_collection(&store, &mut remapper, &spec, &projects).await;

        assert_eq!(outcome.assigned_id("project000000000001"), Some("S1"));
        assert_eq!(remapper.lookup("research_projects", "project000000000001"), Some("S1"));
        assert_eq!(remapper.known_ids("research_projects"), &["S1".to_string()]);

        let sent = &store.creates()[0].record;
        assert!(!sent.contains("collaborators"));
        assert!(!sent.contains("related_models"));
        assert!(!sent.contains(ID_FIELD));
        assert_eq!(sent.get("title"), Some(&json!("Protein folding")));

        let pending = &outcome.pending[0];
        assert_eq!(pending.canonical_id, "S1");
        assert_eq!(
            pending.fields.get("related_models"),
            Some(&json!(["model000000000001"]))
        );
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_batch() {
        let store = store().await;
        store.fail_creates_matching("users", "email", json!("bad@example.com"));
        let mut remapper = IdRemapper::default();
        let spec = CollectionSpec::new("users");
        let users = collection(
            "users",
            vec![
                json!({"id": "u1", "email": "a@example.com"}),
                json!({"id": "u2", "email": "bad@example.com"}),
                json!({"id": "u3", "email": "c@example.com"}),
            ],
        );

        let outcome = insert_collection(&store, &mut remapper, &spec, &users).await;

        assert_eq!(outcome.attempted, 3);
        assert_eq!(
            outcome.assigned,
            vec![
                ("u1".to_string(), "S1".to_string()),
                ("u3".to_string(), "S2".to_string())
            ]
        );
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].record_id, "u2");
        assert_eq!(remapper.lookup("users", "u2"), None);
    }

    #[tokio::test]
    async fn test_resolve_known_self_references() {
        let store = store().await;
        let mut remapper = IdRemapper::default();
        let spec = CollectionSpec::new("models")
            .with_reference(ReferenceField::direct("related_models", "models"))
            .with_self_references(SelfReferencePolicy::ResolveKnown);
        let models = collection(
            "models",
            vec![
                json!({"id": "m1", "related_models": ["m2"]}),
                json!({"id": "m2", "related_models": ["m1", "m3"]}),
            ],
        );

        let outcome = insert_collection(&store, &mut remapper, &spec, &models).await;

        let creates = store.creates();
        assert!(!creates[0].record.contains("related_models"));
        assert_eq!(creates[1].record.get("related_models"), Some(&json!(["S1"])));
        assert_eq!(
            outcome.pending[1].fields.get("related_models"),
            Some(&json!(["m1", "m3"]))
        );
    }

    #[tokio::test]
    async fn test_send_original_id() {
        let store = store().await;
        let mut remapper = IdRemapper::default();
        let spec = CollectionSpec::new("users").sending_original_id();
        let users = collection("users", vec![json!({"id": "abc123def456789"})]);

        insert_collection(&store, &mut remapper, &spec, &users).await;

        assert_eq!(store.creates()[0].record.id(), Some("abc123def456789"));
    }
}
