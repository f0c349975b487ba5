//! Configuration types for the PocketBase store.

use std::time::Duration;

/// Default PocketBase address for a locally running instance.
pub const DEFAULT_POCKETBASE_URL: &str = "http://127.0.0.1:8090";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a PocketBase instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PocketBaseConfig {
    /// Base URL of the instance, e.g. `http://127.0.0.1:8090`.
    pub url: String,
    /// Upper bound for each individual request. Requests are never retried.
    pub timeout: Duration,
}

impl Default for PocketBaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_POCKETBASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PocketBaseConfig {
    /// Create a config for the given base URL with the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
