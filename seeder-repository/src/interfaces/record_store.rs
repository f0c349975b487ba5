//! Record store trait definition.
//!
//! This module defines the abstract interface the seeder writes through,
//! allowing for different backends (PocketBase, an in-memory mock, ...).

use std::sync::Arc;

use async_trait::async_trait;
use seeder_shared::EntityRecord;

use crate::errors::{AuthError, StoreError};
use crate::types::{AuthToken, CreatedRecord, Credentials};

/// Abstracts the external datastore the seeder inserts records into.
///
/// Implementations are injected into the seeder to enable dependency
/// injection and testing with mock implementations. Calls are made one at a
/// time; implementations do not need to handle concurrent record operations
/// for correctness, but must be `Send + Sync` to live behind a trait object.
///
/// # Authentication
///
/// `authenticate` is called once per run before any record operation. The
/// store keeps the token and attaches it to every later call.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Log in with admin credentials.
    ///
    /// # Returns
    ///
    /// * `Ok(AuthToken)` - The token now attached to record operations
    /// * `Err(AuthError)` - If the credentials are refused or the request fails
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, AuthError>;

    /// Insert a record into `collection`.
    ///
    /// The store assigns the record's canonical id and returns it.
    ///
    /// # Arguments
    ///
    /// * `collection` - Name of the target collection
    /// * `record` - The record payload, without fields the store cannot accept yet
    ///
    /// # Returns
    ///
    /// * `Ok(CreatedRecord)` - Carries the store-assigned id
    /// * `Err(StoreError)` - If the record was not created
    async fn create(
        &self,
        collection: &str,
        record: &EntityRecord,
    ) -> Result<CreatedRecord, StoreError>;

    /// Patch the record `id` in `collection` with the given fields.
    ///
    /// Only the fields present in `patch` are changed.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the record was updated
    /// * `Err(StoreError)` - If the update failed
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: &EntityRecord,
    ) -> Result<(), StoreError>;
}

/// Shared stores, so a caller can keep a handle to a store it hands over.
#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, AuthError> {
        (**self).authenticate(credentials).await
    }

    async fn create(
        &self,
        collection: &str,
        record: &EntityRecord,
    ) -> Result<CreatedRecord, StoreError> {
        (**self).create(collection, record).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: &EntityRecord,
    ) -> Result<(), StoreError> {
        (**self).update(collection, id, patch).await
    }
}
