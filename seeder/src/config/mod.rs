//! Configuration and dependency initialization.

mod dependencies;

pub use dependencies::{Dependencies, Settings};
