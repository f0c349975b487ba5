//! Relationship reconciliation.
//!
//! Once every collection is inserted, the references stripped by the
//! inserter are rewritten to store-assigned ids and pushed back with one
//! update per record. Synthetic fields are filled by sampling the target
//! collection's known ids instead.
//!
//! Patch building is pure: for direct fields the payloads depend only on the
//! remapper state, so building twice on the same state yields the same
//! patches.

use rand::seq::SliceRandom;
use rand::Rng;
use seeder_repository::RecordStore;
use seeder_shared::{CollectionSpec, EntityRecord, ReferenceField, ReferenceValue, RelationshipMode};
use tracing::{debug, info, instrument, warn};

use crate::inserter::PendingLinks;
use crate::remapper::{holds_references, IdRemapper, RewriteMode};
use crate::report::{FailureStage, RecordFailure, ReferentialGap, SamplingShortfall};

/// Update for one record, keyed by its canonical id.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPatch {
    pub collection: String,
    pub original_id: String,
    pub canonical_id: String,
    pub patch: EntityRecord,
}

/// All patches for one collection plus what was dropped on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchSet {
    pub patches: Vec<RecordPatch>,
    pub gaps: Vec<ReferentialGap>,
    pub shortfalls: Vec<SamplingShortfall>,
}

/// Result of pushing a patch set to the store.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub updated: usize,
    pub failures: Vec<RecordFailure>,
}

/// Build the update for every pending record of one collection.
///
/// Direct references are kept only if they resolve to a record bound in the
/// target collection. Scalars that do not resolve and lists left empty are
/// omitted. Records with nothing to update get no patch.
///
/// Direct relinking is a strict rewrite and never allocates, so `remapper`
/// is left as it was.
pub fn build_patches<R: Rng>(
    spec: &CollectionSpec,
    pending: &[PendingLinks],
    remapper: &mut IdRemapper,
    rng: &mut R,
) -> PatchSet {
    let mut set = PatchSet::default();
    let direct: Vec<&ReferenceField> = spec
        .references
        .iter()
        .filter(|field| !field.is_synthetic())
        .collect();

    for links in pending {
        let mut patch = relink_direct(spec, &direct, links, remapper, &mut set.gaps);

        for field in &spec.references {
            let RelationshipMode::Synthetic {
                min_count,
                max_count,
            } = field.mode
            else {
                continue;
            };
            if let Some(value) = sample_synthetic(
                spec,
                field,
                links,
                remapper,
                (min_count, max_count),
                rng,
                &mut set.shortfalls,
            ) {
                patch.insert(field.name.clone(), value.into_value());
            }
        }

        if patch.is_empty() {
            continue;
        }
        set.patches.push(RecordPatch {
            collection: spec.name.clone(),
            original_id: links.original_id.clone(),
            canonical_id: links.canonical_id.clone(),
            patch,
        });
    }

    set
}

fn relink_direct(
    spec: &CollectionSpec,
    fields: &[&ReferenceField],
    links: &PendingLinks,
    remapper: &mut IdRemapper,
    gaps: &mut Vec<ReferentialGap>,
) -> EntityRecord {
    let mut rewritten = links.fields.clone();
    let outcome =
        remapper.rewrite_references(&mut rewritten, fields.iter().copied(), RewriteMode::Strict);

    for dropped in outcome.dropped {
        debug!(
            collection = %spec.name,
            record_id = %links.original_id,
            field = %dropped.field,
            reference = %dropped.reference,
            "Dropping reference to record that was never inserted"
        );
        gaps.push(ReferentialGap {
            collection: spec.name.clone(),
            record_id: links.original_id.clone(),
            field: dropped.field,
            reference: dropped.reference,
        });
    }

    let mut patch = EntityRecord::new();
    for field in fields {
        if let Some(value) = rewritten.remove(&field.name).filter(holds_references) {
            patch.insert(field.name.clone(), value);
        }
    }
    patch
}

fn sample_synthetic<R: Rng>(
    spec: &CollectionSpec,
    field: &ReferenceField,
    links: &PendingLinks,
    remapper: &IdRemapper,
    (min_count, max_count): (usize, usize),
    rng: &mut R,
    shortfalls: &mut Vec<SamplingShortfall>,
) -> Option<ReferenceValue> {
    let pool: Vec<&String> = remapper
        .known_ids(&field.target)
        .iter()
        .filter(|id| !(spec.is_self_reference(field) && **id == links.canonical_id))
        .collect();

    let requested = rng.gen_range(min_count..=max_count);
    let count = if requested > pool.len() {
        debug!(
            collection = %spec.name,
            record_id = %links.original_id,
            field = %field.name,
            requested,
            available = pool.len(),
            "Synthetic pool too small, using all of it"
        );
        shortfalls.push(SamplingShortfall {
            collection: spec.name.clone(),
            record_id: links.original_id.clone(),
            field: field.name.clone(),
            target: field.target.clone(),
            requested,
            available: pool.len(),
        });
        pool.len()
    } else {
        requested
    };

    let sample: Vec<String> = pool
        .choose_multiple(rng, count)
        .map(|id| (*id).clone())
        .collect();
    (!sample.is_empty()).then_some(ReferenceValue::Many(sample))
}

/// Send every patch of `collection` to the store, one at a time.
///
/// A failed update is recorded and the remaining patches are still sent.
#[instrument(skip_all, fields(collection = %collection, patches = set.patches.len()))]
pub async fn reconcile(
    store: &dyn RecordStore,
    collection: &str,
    set: &PatchSet,
) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();

    for patch in &set.patches {
        match store
            .update(&patch.collection, &patch.canonical_id, &patch.patch)
            .await
        {
            Ok(()) => {
                outcome.updated += 1;
                debug!(
                    collection = %patch.collection,
                    record_id = %patch.canonical_id,
                    fields = patch.patch.len(),
                    "Updated record references"
                );
            }
            Err(e) => {
                warn!(
                    collection = %patch.collection,
                    record_id = %patch.canonical_id,
                    error = %e,
                    "Failed to update record references"
                );
                outcome.failures.push(RecordFailure {
                    collection: patch.collection.clone(),
                    record_id: patch.canonical_id.clone(),
                    stage: FailureStage::Update,
                    detail: e.to_string(),
                });
            }
        }
    }

    info!(
        collection = %collection,
        updated = outcome.updated,
        failed = outcome.failures.len(),
        gaps = set.gaps.len(),
        "Collection reconciled"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use std::collections::HashSet;

    fn pending(original: &str, canonical: &str, fields: serde_json::Value) -> PendingLinks {
        PendingLinks {
            original_id: original.to_string(),
            canonical_id: canonical.to_string(),
            fields: EntityRecord::try_from(fields).unwrap(),
        }
    }

    fn users_bound() -> IdRemapper {
        let mut remapper = IdRemapper::default();
        remapper.bind("users", "u1", "S1").unwrap();
        remapper.bind("users", "u2", "S2").unwrap();
        remapper
    }

    #[test]
    fn test_direct_references_are_relinked() {
        let mut remapper = users_bound();
        remapper.bind("profiles", "p1", "S3").unwrap();
        remapper.bind("profiles", "p2", "S4").unwrap();
        let spec =
            CollectionSpec::new("profiles").with_reference(ReferenceField::direct("user", "users"));
        let links = vec![
            pending("p1", "S3", json!({"user": "u1"})),
            pending("p2", "S4", json!({"user": "u9"})),
        ];

        let set = build_patches(&spec, &links, &mut remapper, &mut StdRng::seed_from_u64(7));

        assert_eq!(set.patches.len(), 1);
        assert_eq!(set.patches[0].canonical_id, "S3");
        assert_eq!(set.patches[0].patch.get("user"), Some(&json!("S1")));
        assert_eq!(set.gaps.len(), 1);
        assert_eq!(set.gaps[0].record_id, "p2");
        assert_eq!(set.gaps[0].reference, "u9");
    }

    #[test]
    fn test_reference_into_wrong_collection_is_a_gap() {
        let mut remapper = users_bound();
        remapper.bind("models", "m1", "S5").unwrap();
        let spec = CollectionSpec::new("research_projects")
            .with_reference(ReferenceField::direct("collaborators", "users"));
        let links = vec![pending("r1", "S6", json!({"collaborators": ["u2", "m1", "u1"]}))];

        let set = build_patches(&spec, &links, &mut remapper, &mut StdRng::seed_from_u64(7));

        assert_eq!(
            set.patches[0].patch.get("collaborators"),
            Some(&json!(["S2", "S1"]))
        );
        assert_eq!(set.gaps.len(), 1);
        assert_eq!(set.gaps[0].reference, "m1");
    }

    #[test]
    fn test_non_string_list_elements_are_gaps() {
        let mut remapper = IdRemapper::default();
        remapper.bind("models", "m1", "S1").unwrap();
        let spec = CollectionSpec::new("research_projects")
            .with_reference(ReferenceField::direct("related_models", "models"));
        let links = vec![pending("r1", "S2", json!({"related_models": ["m1", null]}))];

        let set = build_patches(&spec, &links, &mut remapper, &mut StdRng::seed_from_u64(7));

        assert_eq!(
            set.patches[0].patch.get("related_models"),
            Some(&json!(["S1"]))
        );
        assert_eq!(set.gaps.len(), 1);
        assert_eq!(set.gaps[0].field, "related_models");
        assert_eq!(set.gaps[0].reference, "null");
    }

    #[test]
    fn test_same_original_id_resolves_against_field_target() {
        let mut remapper = IdRemapper::default();
        remapper.bind("users", "1", "S1").unwrap();
        remapper.bind("models", "1", "S2").unwrap();
        let spec = CollectionSpec::new("projects")
            .with_reference(ReferenceField::direct("owner", "users"))
            .with_reference(ReferenceField::direct("related_models", "models"));
        let links = vec![pending("1", "S3", json!({"owner": "1", "related_models": ["1"]}))];

        let set = build_patches(&spec, &links, &mut remapper, &mut StdRng::seed_from_u64(7));

        assert_eq!(set.patches[0].patch.get("owner"), Some(&json!("S1")));
        assert_eq!(
            set.patches[0].patch.get("related_models"),
            Some(&json!(["S2"]))
        );
        assert!(set.gaps.is_empty());
    }

    #[test]
    fn test_direct_patches_are_repeatable() {
        let mut remapper = users_bound();
        let spec = CollectionSpec::new("research_projects")
            .with_reference(ReferenceField::direct("collaborators", "users"));
        let links = vec![pending("r1", "S6", json!({"collaborators": ["u1", "u2"]}))];

        let first = build_patches(&spec, &links, &mut remapper, &mut StdRng::seed_from_u64(1));
        let second = build_patches(&spec, &links, &mut remapper, &mut StdRng::seed_from_u64(2));
        assert_eq!(first, second);
    }

    #[test]
    fn test_synthetic_sampling_is_distinct_and_bounded() {
        let mut remapper = IdRemapper::default();
        for n in 1..=10 {
            remapper
                .bind("models", &format!("m{}", n), &format!("S{}", n))
                .unwrap();
        }
        let spec = CollectionSpec::new("research_projects")
            .with_reference(ReferenceField::synthetic("related_models", "models", 2, 4));
        let links: Vec<PendingLinks> = (1..=25)
            .map(|n| pending(&format!("r{}", n), &format!("R{}", n), json!({})))
            .collect();

        let set = build_patches(&spec, &links, &mut remapper, &mut StdRng::seed_from_u64(42));

        assert_eq!(set.patches.len(), 25);
        assert!(set.shortfalls.is_empty());
        for patch in &set.patches {
            let ids = ReferenceValue::from_value(patch.patch.get("related_models").unwrap()).unwrap();
            let ids = ids.ids();
            let distinct: HashSet<&str> = ids.iter().copied().collect();
            assert!((2..=4).contains(&ids.len()));
            assert_eq!(distinct.len(), ids.len());
            assert!(ids.iter().all(|id| remapper.is_known("models", id)));
        }
    }

    #[test]
    fn test_synthetic_pool_smaller_than_min() {
        let mut remapper = IdRemapper::default();
        remapper.bind("models", "m1", "S1").unwrap();
        remapper.bind("models", "m2", "S2").unwrap();
        let spec = CollectionSpec::new("research_projects")
            .with_reference(ReferenceField::synthetic("related_models", "models", 3, 5));
        let links = vec![pending("r1", "S3", json!({}))];

        let set = build_patches(&spec, &links, &mut remapper, &mut StdRng::seed_from_u64(3));

        let ids = set.patches[0].patch.get("related_models").unwrap().as_array().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(set.shortfalls.len(), 1);
        assert_eq!(set.shortfalls[0].available, 2);
        assert!(set.shortfalls[0].requested >= 3);
    }

    #[test]
    fn test_synthetic_self_reference_excludes_own_id() {
        let mut remapper = IdRemapper::default();
        remapper.bind("models", "m1", "S1").unwrap();
        remapper.bind("models", "m2", "S2").unwrap();
        let spec = CollectionSpec::new("models")
            .with_reference(ReferenceField::synthetic("related_models", "models", 1, 1));
        let links = vec![pending("m1", "S1", json!({})), pending("m2", "S2", json!({}))];

        let set = build_patches(&spec, &links, &mut remapper, &mut StdRng::seed_from_u64(9));

        assert_eq!(set.patches[0].patch.get("related_models"), Some(&json!(["S2"])));
        assert_eq!(set.patches[1].patch.get("related_models"), Some(&json!(["S1"])));
    }

    #[tokio::test]
    async fn test_reconcile_continues_after_failed_update() {
        use seeder_repository::{Credentials, MockRecordStore};

        let store = MockRecordStore::new();
        store
            .authenticate(&Credentials::new("admin", "secret"))
            .await
            .unwrap();
        for _ in 0..2 {
            store.create("profiles", &EntityRecord::new()).await.unwrap();
        }
        store.fail_updates_for("S1");

        let patch = |id: &str| RecordPatch {
            collection: "profiles".to_string(),
            original_id: id.to_lowercase(),
            canonical_id: id.to_string(),
            patch: EntityRecord::try_from(json!({"user": "S9"})).unwrap(),
        };
        let set = PatchSet {
            patches: vec![patch("S1"), patch("S2")],
            ..PatchSet::default()
        };

        let outcome = reconcile(&store, "profiles", &set).await;

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].record_id, "S1");
        assert_eq!(
            store.record("profiles", "S2").unwrap().get("user"),
            Some(&json!("S9"))
        );
    }

    #[tokio::test]
    async fn test_reconcile_empty_patch_set() {
        use seeder_repository::MockRecordStore;

        let store = MockRecordStore::new();
        let outcome = reconcile(&store, "users", &PatchSet::default()).await;

        assert_eq!(outcome.updated, 0);
        assert!(outcome.failures.is_empty());
        assert!(store.updates().is_empty());
    }
}
