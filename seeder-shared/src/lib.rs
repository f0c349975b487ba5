//! # Seeder Shared
//!
//! This crate defines the data structures shared across the seeder ecosystem:
//! entity records and collections as they are read from fixture files, and the
//! seed plan describing how collections reference each other.

pub mod types;

pub use types::plan::{
    CollectionSpec, ReferenceField, RelationshipMode, SeedPlan, SelfReferencePolicy,
};
pub use types::record::{EntityCollection, EntityRecord, ReferenceValue, ID_FIELD};
