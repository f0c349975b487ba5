use std::collections::HashMap;

use async_trait::async_trait;
use seeder_shared::EntityCollection;

use super::CollectionSource;
use crate::errors::LoadError;

/// Collections held in memory, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    collections: HashMap<String, EntityCollection>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a collection.
    pub fn with(mut self, collection: EntityCollection) -> Self {
        self.insert(collection);
        self
    }

    pub fn insert(&mut self, collection: EntityCollection) {
        self.collections
            .insert(collection.name().to_string(), collection);
    }
}

#[async_trait]
impl CollectionSource for InMemorySource {
    async fn load(&self, collection: &str) -> Result<EntityCollection, LoadError> {
        self.collections
            .get(collection)
            .cloned()
            .ok_or_else(|| LoadError::not_found(collection, "in-memory source"))
    }
}
