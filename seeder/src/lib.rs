//! # Seeder
//!
//! Referential seed builder for the research platform. Takes fixture
//! collections whose reference fields hold placeholder ids, inserts them into
//! a record store and relinks every reference to the ids the store assigned.
//!
//! ## Architecture
//!
//! A run goes through four stages:
//!
//! 1. **Loader**: Reads raw collections and assigns placeholder ids
//! 2. **Inserter**: Creates records in dependency order with references stripped
//! 3. **Reconciler**: Rewrites references to store ids and patches the records
//! 4. **Orchestrator**: Coordinates the stages and collects the run report
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`remapper`]: Placeholder to canonical id mapping
//! - [`loader`]: Collection sources and record preparation
//! - [`planner`]: Plan validation and insertion order
//! - [`inserter`]: Dependency-ordered record creation
//! - [`reconciler`]: Reference rewriting and synthetic relationships
//! - [`report`]: Run-level report of non-fatal problems
//! - [`orchestrator`]: Seeding and offline remap runs
//! - [`errors`]: Error types for the stages

pub mod config;
pub mod errors;
pub mod inserter;
pub mod loader;
pub mod orchestrator;
pub mod planner;
pub mod reconciler;
pub mod remapper;
pub mod report;

pub use config::{Dependencies, Settings};
pub use errors::{LoadError, PlanError, RemapError};
pub use orchestrator::{remap_directory, RemapSummary, Seeder};
pub use remapper::{CanonicalIdGenerator, IdRemapper, RewriteMode, RewriteOutcome};
pub use report::SeedReport;

use seeder_repository::{AuthError, StoreError};
use thiserror::Error;

/// Errors that abort a seeding or remap run.
#[derive(Error, Debug)]
pub enum SeedError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The record store refused the admin credentials.
    #[error("Authentication error: {0}")]
    AuthenticationError(#[from] AuthError),

    /// A collection could not be loaded.
    #[error("Source load error: {0}")]
    SourceLoadError(#[from] LoadError),

    /// The seed plan is invalid.
    #[error("Plan error: {0}")]
    PlanError(#[from] PlanError),

    /// The identifier mapping rejected a binding.
    #[error("Remap error: {0}")]
    RemapError(#[from] RemapError),

    /// The record store could not be constructed.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

impl SeedError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
