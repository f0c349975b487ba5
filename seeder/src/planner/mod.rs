//! Seed plan validation and insertion order.

use std::collections::HashSet;

use seeder_shared::{CollectionSpec, RelationshipMode, SeedPlan};
use tracing::{debug, warn};

use crate::errors::PlanError;

/// Check that a plan is internally consistent.
///
/// Collection names and field names within a collection must be unique,
/// every reference must target a declared collection, and synthetic ranges
/// must have `min_count <= max_count`.
pub fn validate(plan: &SeedPlan) -> Result<(), PlanError> {
    let mut names = HashSet::new();
    for spec in &plan.collections {
        if !names.insert(spec.name.as_str()) {
            return Err(PlanError::DuplicateCollection(spec.name.clone()));
        }
    }

    for spec in &plan.collections {
        let mut fields = HashSet::new();
        for field in &spec.references {
            if !fields.insert(field.name.as_str()) {
                return Err(PlanError::DuplicateField {
                    collection: spec.name.clone(),
                    field: field.name.clone(),
                });
            }

            if !names.contains(field.target.as_str()) {
                return Err(PlanError::UnknownTarget {
                    collection: spec.name.clone(),
                    field: field.name.clone(),
                    target: field.target.clone(),
                });
            }

            if let RelationshipMode::Synthetic {
                min_count,
                max_count,
            } = field.mode
            {
                if min_count > max_count {
                    return Err(PlanError::InvalidRange {
                        collection: spec.name.clone(),
                        field: field.name.clone(),
                        min: min_count,
                        max: max_count,
                    });
                }
            }
        }
    }

    Ok(())
}

/// Order in which collections are inserted: dependencies first.
///
/// Among collections whose dependencies are all placed, the earliest
/// declared goes first. When every remaining collection waits on another
/// one, the cycle is broken at the earliest declared collection.
pub fn load_order(plan: &SeedPlan) -> Result<Vec<&CollectionSpec>, PlanError> {
    validate(plan)?;

    let mut remaining: Vec<&CollectionSpec> = plan.collections.iter().collect();
    let mut placed: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|spec| {
            spec.dependencies()
                .iter()
                .all(|dependency| placed.contains(dependency))
        });

        let index = match ready {
            Some(index) => index,
            None => {
                let pending: Vec<&str> = remaining.iter().map(|spec| spec.name.as_str()).collect();
                warn!(
                    collection = %remaining[0].name,
                    pending = ?pending,
                    "Dependency cycle detected, inserting earliest declared collection first"
                );
                0
            }
        };

        let spec = remaining.remove(index);
        placed.insert(spec.name.as_str());
        order.push(spec);
    }

    debug!(
        order = ?order.iter().map(|spec| spec.name.as_str()).collect::<Vec<_>>(),
        "Resolved load order"
    );
    Ok(order)
}
