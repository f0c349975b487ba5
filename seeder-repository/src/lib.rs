//! # Seeder Repository
//!
//! This crate provides the record store abstraction the seeder writes into.
//! It includes definitions for errors, the `RecordStore` interface, a
//! concrete implementation for PocketBase, and an in-memory store used for
//! tests and dry runs.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod mock;
pub mod pocketbase;
pub mod source;
pub mod types;

pub use config::PocketBaseConfig;
pub use errors::{AuthError, StoreError};
pub use interfaces::RecordStore;
pub use mock::{CreateCall, MockRecordStore, UpdateCall};
pub use pocketbase::PocketBaseStore;
pub use source::StoreSource;
pub use types::{AuthToken, CreatedRecord, Credentials};
