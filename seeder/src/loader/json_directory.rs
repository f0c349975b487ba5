use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use seeder_shared::EntityCollection;
use tracing::{debug, info};

use super::{collection_from_value, CollectionSource};
use crate::errors::LoadError;

/// Collections stored as `{root}/{collection}.json`, one JSON array each.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    root: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the named collection.
    pub fn path_for(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.json", collection))
    }

    /// Write a collection back to its file, pretty-printed.
    pub async fn store(&self, collection: &EntityCollection) -> Result<(), LoadError> {
        let path = self.path_for(collection.name());
        let body = serde_json::to_string_pretty(collection.records())
            .map_err(|e| LoadError::json(collection.name(), e.to_string()))?;

        tokio::fs::write(&path, body)
            .await
            .map_err(|e| LoadError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        info!(
            collection = %collection.name(),
            records = collection.len(),
            path = %path.display(),
            "Wrote collection"
        );
        Ok(())
    }
}

#[async_trait]
impl CollectionSource for JsonDirectorySource {
    async fn load(&self, collection: &str) -> Result<EntityCollection, LoadError> {
        let path = self.path_for(collection);
        debug!(collection = %collection, path = %path.display(), "Reading collection");

        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LoadError::not_found(collection, path.display().to_string()));
            }
            Err(e) => {
                return Err(LoadError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        let value = serde_json::from_str(&body)
            .map_err(|e| LoadError::json(collection, e.to_string()))?;
        collection_from_value(collection, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seeder_shared::EntityRecord;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_reads_records_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("users.json"),
            r#"[{"id": "u1", "email": "a@example.com"}, {"id": "u2"}]"#,
        )
        .unwrap();

        let source = JsonDirectorySource::new(dir.path());
        let users = source.load("users").await.unwrap();

        assert_eq!(users.name(), "users");
        assert_eq!(users.ids(), vec!["u1", "u2"]);
        assert_eq!(
            users.records()[0].get("email"),
            Some(&json!("a@example.com"))
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_source_not_found() {
        let dir = TempDir::new().unwrap();
        let source = JsonDirectorySource::new(dir.path());

        let err = source.load("models").await.unwrap_err();
        assert!(matches!(err, LoadError::SourceNotFound { ref collection, .. } if collection == "models"));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("models.json"), "[{").unwrap();

        let source = JsonDirectorySource::new(dir.path());
        let err = source.load("models").await.unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let dir = TempDir::new().unwrap();
        let source = JsonDirectorySource::new(dir.path());
        let models = EntityCollection::new(
            "models",
            vec![EntityRecord::try_from(json!({"id": "m1", "related_models": ["m2"]})).unwrap()],
        );

        source.store(&models).await.unwrap();
        let written = std::fs::read_to_string(source.path_for("models")).unwrap();
        assert!(written.contains("\n"));

        let loaded = source.load("models").await.unwrap();
        assert_eq!(loaded, models);
    }
}
