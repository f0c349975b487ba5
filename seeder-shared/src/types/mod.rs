//! This module defines the core data structures used across the seeder.
//! It re-exports the record types and the seed plan types.

pub mod plan;
pub mod record;

pub use plan::{CollectionSpec, ReferenceField, RelationshipMode, SeedPlan, SelfReferencePolicy};
pub use record::{EntityCollection, EntityRecord, ReferenceValue, ID_FIELD};
