//! Configuration for choosing the record store backend.
//!
//! # Example
//!
//! ```ignore
//! use seeder_repository::{PocketBaseConfig, StoreSource};
//!
//! // Dry run: nothing leaves the process
//! let store = StoreSource::dry_run().into_store()?;
//!
//! // Live PocketBase instance
//! let store = StoreSource::pocketbase(PocketBaseConfig::new("http://127.0.0.1:8090")).into_store()?;
//! ```

use crate::config::PocketBaseConfig;
use crate::errors::StoreError;
use crate::interfaces::RecordStore;
use crate::mock::MockRecordStore;
use crate::pocketbase::PocketBaseStore;

/// Which record store a seeding run writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSource {
    /// Write into an in-memory store that is discarded at exit.
    DryRun,

    /// Write into a live PocketBase instance.
    PocketBase(PocketBaseConfig),
}

impl StoreSource {
    pub fn dry_run() -> Self {
        Self::DryRun
    }

    pub fn pocketbase(config: PocketBaseConfig) -> Self {
        Self::PocketBase(config)
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }

    /// Create the appropriate `RecordStore` implementation.
    pub fn into_store(self) -> Result<Box<dyn RecordStore>, StoreError> {
        match self {
            Self::DryRun => Ok(Box::new(MockRecordStore::new())),
            Self::PocketBase(config) => Ok(Box::new(PocketBaseStore::new(config)?)),
        }
    }
}
