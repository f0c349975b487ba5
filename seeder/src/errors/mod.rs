//! Error types for the seeder pipeline stages.

use thiserror::Error;

/// Errors that can occur while reading a collection from its source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The source has no data for the requested collection.
    #[error("Source not found for collection {collection}: {location}")]
    SourceNotFound {
        collection: String,
        location: String,
    },

    /// A record could not be interpreted as a key/value record.
    #[error("Malformed record #{index} in {collection}: {reason}")]
    MalformedRecord {
        collection: String,
        index: usize,
        reason: String,
    },

    /// The source exists but could not be read or written.
    #[error("I/O error for {path}: {message}")]
    Io { path: String, message: String },

    /// The source is not valid JSON or not a list of records.
    #[error("Invalid JSON for collection {collection}: {message}")]
    Json { collection: String, message: String },
}

impl LoadError {
    pub fn not_found(collection: impl Into<String>, location: impl Into<String>) -> Self {
        Self::SourceNotFound {
            collection: collection.into(),
            location: location.into(),
        }
    }

    pub fn malformed(collection: impl Into<String>, index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            collection: collection.into(),
            index,
            reason: reason.into(),
        }
    }

    pub fn json(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Json {
            collection: collection.into(),
            message: message.into(),
        }
    }
}

/// Errors in a seed plan, detected before any data is loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Collection {0} is declared more than once")]
    DuplicateCollection(String),

    #[error("Field {field} of {collection} references undeclared collection {target}")]
    UnknownTarget {
        collection: String,
        field: String,
        target: String,
    },

    #[error("Field {field} of {collection} has min_count {min} greater than max_count {max}")]
    InvalidRange {
        collection: String,
        field: String,
        min: usize,
        max: usize,
    },

    #[error("Field {field} is declared more than once on {collection}")]
    DuplicateField { collection: String, field: String },
}

/// Errors raised when the identifier mapping would stop being one-to-one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemapError {
    /// The original id is already mapped to a different canonical id.
    #[error("Mapping conflict: {collection}/{original} is already mapped to {existing}, refusing {attempted}")]
    MappingConflict {
        collection: String,
        original: String,
        existing: String,
        attempted: String,
    },

    /// The canonical id already belongs to a different original id.
    #[error("Mapping conflict: canonical id {canonical} already belongs to {owner}, refusing {original}")]
    CanonicalConflict {
        canonical: String,
        owner: String,
        original: String,
    },
}
