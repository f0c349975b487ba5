//! PocketBase implementation of the record store.
//!
//! This module provides a concrete implementation of `RecordStore`
//! using PocketBase's REST API as the backend.

mod provider;

pub use provider::PocketBaseStore;
