//! Error types for the seeder repository.
//!
//! Store operations fail with `StoreError`; authentication has its own
//! `AuthError` because a failed login aborts a seeding run while a failed
//! record operation does not.

mod store_error;

pub use store_error::{AuthError, StoreError};
