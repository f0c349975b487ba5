//! Interface definitions for the record store.
//!
//! This module defines the abstract `RecordStore` trait that allows for
//! dependency injection and swappable backends.

mod record_store;

pub use record_store::RecordStore;
