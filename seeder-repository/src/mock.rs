//! In-memory record store for testing and dry runs.
//!
//! The `MockRecordStore` assigns sequential ids (`S1`, `S2`, ...) across all
//! collections, keeps every record it was given, and logs every create and
//! update call. Failures can be injected per record so that partial-failure
//! paths can be exercised without a live backend.
//!
//! # Example
//!
//! ```ignore
//! use seeder_repository::{MockRecordStore, RecordStore, Credentials};
//! use serde_json::json;
//!
//! let store = MockRecordStore::new();
//! store.fail_creates_matching("users", "email", json!("broken@example.com"));
//!
//! store.authenticate(&Credentials::new("admin", "secret")).await?;
//! let created = store.create("users", &record).await?;
//! assert_eq!(created.id, "S1");
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use seeder_shared::EntityRecord;
use serde_json::Value;

use crate::errors::{AuthError, StoreError};
use crate::interfaces::RecordStore;
use crate::types::{AuthToken, CreatedRecord, Credentials};

/// A create call as received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCall {
    pub collection: String,
    pub record: EntityRecord,
    /// Id assigned to the record, `None` if the create failed.
    pub assigned_id: Option<String>,
}

/// An update call as received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCall {
    pub collection: String,
    pub id: String,
    pub patch: EntityRecord,
}

#[derive(Default)]
struct MockState {
    next_id: usize,
    /// collection -> (assigned id -> stored record)
    records: HashMap<String, HashMap<String, EntityRecord>>,
    creates: Vec<CreateCall>,
    updates: Vec<UpdateCall>,
    failing_creates: Vec<(String, String, Value)>,
    failing_updates: HashSet<String>,
    refuse_auth: bool,
    token: Option<AuthToken>,
}

/// Mock record store that keeps everything in memory.
pub struct MockRecordStore {
    state: Mutex<MockState>,
}

impl MockRecordStore {
    /// Create a new empty mock store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    /// Create a mock store that refuses every authentication attempt.
    pub fn refusing_auth() -> Self {
        let store = Self::new();
        store.lock().refuse_auth = true;
        store
    }

    /// A poisoned lock only means a test panicked mid-call; the state is
    /// still usable for inspection.
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject creates in `collection` whose `field` equals `value`.
    pub fn fail_creates_matching(&self, collection: &str, field: &str, value: Value) {
        self.lock()
            .failing_creates
            .push((collection.to_string(), field.to_string(), value));
    }

    /// Reject every update addressed to the record with this assigned id.
    pub fn fail_updates_for(&self, id: &str) {
        self.lock().failing_updates.insert(id.to_string());
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().token.is_some()
    }

    /// All create calls in the order they were made, including failed ones.
    pub fn creates(&self) -> Vec<CreateCall> {
        self.lock().creates.clone()
    }

    /// All update calls in the order they were made, including failed ones.
    pub fn updates(&self) -> Vec<UpdateCall> {
        self.lock().updates.clone()
    }

    /// Update calls addressed to one collection.
    pub fn updates_for(&self, collection: &str) -> Vec<UpdateCall> {
        self.lock()
            .updates
            .iter()
            .filter(|call| call.collection == collection)
            .cloned()
            .collect()
    }

    /// The stored state of a record, with all successful patches applied.
    pub fn record(&self, collection: &str, id: &str) -> Option<EntityRecord> {
        self.lock()
            .records
            .get(collection)
            .and_then(|records| records.get(id))
            .cloned()
    }

    /// Ids assigned in `collection`, in creation order.
    pub fn assigned_ids(&self, collection: &str) -> Vec<String> {
        self.lock()
            .creates
            .iter()
            .filter(|call| call.collection == collection)
            .filter_map(|call| call.assigned_id.clone())
            .collect()
    }

    /// Number of records stored across all collections.
    pub fn len(&self) -> usize {
        self.lock().records.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MockRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, AuthError> {
        let mut state = self.lock();
        if state.refuse_auth {
            return Err(AuthError::invalid_credentials(format!(
                "mock store refused {}",
                credentials.identity
            )));
        }
        let token = AuthToken::new(format!("mock-token-{}", credentials.identity));
        state.token = Some(token.clone());
        Ok(token)
    }

    async fn create(
        &self,
        collection: &str,
        record: &EntityRecord,
    ) -> Result<CreatedRecord, StoreError> {
        let mut state = self.lock();
        if state.token.is_none() {
            return Err(StoreError::unauthenticated("create"));
        }

        let rejected = state.failing_creates.iter().any(|(c, field, value)| {
            c == collection && record.get(field) == Some(value)
        });
        if rejected {
            state.creates.push(CreateCall {
                collection: collection.to_string(),
                record: record.clone(),
                assigned_id: None,
            });
            return Err(StoreError::rejected(
                400,
                format!("mock store rejected record in {}", collection),
            ));
        }

        state.next_id += 1;
        let id = format!("S{}", state.next_id);

        let mut stored = record.clone();
        stored.set_id(id.clone());
        state
            .records
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), stored);
        state.creates.push(CreateCall {
            collection: collection.to_string(),
            record: record.clone(),
            assigned_id: Some(id.clone()),
        });

        Ok(CreatedRecord::new(id))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: &EntityRecord,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.token.is_none() {
            return Err(StoreError::unauthenticated("update"));
        }

        state.updates.push(UpdateCall {
            collection: collection.to_string(),
            id: id.to_string(),
            patch: patch.clone(),
        });

        if state.failing_updates.contains(id) {
            return Err(StoreError::rejected(
                400,
                format!("mock store rejected update of {}", id),
            ));
        }

        let stored = state
            .records
            .get_mut(collection)
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| StoreError::rejected(404, format!("{}/{} not found", collection, id)))?;
        for (field, value) in patch.fields() {
            stored.insert(field.clone(), value.clone());
        }

        Ok(())
    }
}
