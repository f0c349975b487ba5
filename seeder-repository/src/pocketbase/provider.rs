//! PocketBase record store implementation.
//!
//! This module provides the concrete implementation of `RecordStore` on top
//! of PocketBase's REST API, using an admin token for every record call.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use seeder_shared::EntityRecord;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::config::PocketBaseConfig;
use crate::errors::{AuthError, StoreError};
use crate::interfaces::RecordStore;
use crate::types::{AuthToken, CreatedRecord, Credentials};

/// PocketBase store implementation.
///
/// # Example
///
/// ```ignore
/// use seeder_repository::{Credentials, PocketBaseConfig, PocketBaseStore, RecordStore};
///
/// let store = PocketBaseStore::new(PocketBaseConfig::new("http://127.0.0.1:8090"))?;
/// store
///     .authenticate(&Credentials::new("admin@example.com", "secret"))
///     .await?;
/// let created = store.create("users", &record).await?;
/// ```
pub struct PocketBaseStore {
    base_url: Url,
    client: Client,
    token: RwLock<Option<AuthToken>>,
}

impl PocketBaseStore {
    /// Create a new store for the PocketBase instance in `config`.
    ///
    /// No request is made until `authenticate` is called.
    ///
    /// # Returns
    ///
    /// * `Ok(PocketBaseStore)` - A new store instance
    /// * `Err(StoreError::Config)` - If the URL is invalid or the HTTP client cannot be built
    pub fn new(config: PocketBaseConfig) -> Result<Self, StoreError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| StoreError::config(format!("invalid url {}: {}", config.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::config(format!(
                "url {} cannot be used as a base",
                config.url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::config(e.to_string()))?;

        info!(
            url = %base_url,
            timeout_secs = config.timeout.as_secs(),
            "Created PocketBase store"
        );

        Ok(Self {
            base_url,
            client,
            token: RwLock::new(None),
        })
    }

    /// Build an endpoint URL from path segments, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::config("base url cannot have path segments"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn records_url(&self, collection: &str, id: Option<&str>) -> Result<Url, StoreError> {
        match id {
            Some(id) => self.endpoint(&["api", "collections", collection, "records", id]),
            None => self.endpoint(&["api", "collections", collection, "records"]),
        }
    }

    /// Authorization header value for record calls.
    async fn bearer(&self, operation: &str) -> Result<String, StoreError> {
        self.token
            .read()
            .await
            .as_ref()
            .map(|token| format!("Bearer {}", token.as_str()))
            .ok_or_else(|| StoreError::unauthenticated(operation.to_string()))
    }

    /// Turn a non-success response into `StoreError::Rejected`.
    async fn check_status(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::rejected(status.as_u16(), body))
    }

    async fn json_body(response: Response) -> Result<Value, StoreError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::invalid_response(e.to_string()))
    }
}

#[async_trait]
impl RecordStore for PocketBaseStore {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, AuthError> {
        let url = self.endpoint(&["api", "admins", "auth-with-password"])?;
        let response = self
            .client
            .post(url)
            .json(&json!({
                "identity": credentials.identity,
                "password": credentials.password,
            }))
            .send()
            .await
            .map_err(StoreError::from)?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::invalid_credentials(body));
        }

        let body = Self::json_body(Self::check_status(response).await?).await?;
        let token = body
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(AuthToken::new)
            .ok_or(AuthError::MissingToken)?;

        *self.token.write().await = Some(token.clone());
        info!(identity = %credentials.identity, "Authenticated against PocketBase");

        Ok(token)
    }

    async fn create(
        &self,
        collection: &str,
        record: &EntityRecord,
    ) -> Result<CreatedRecord, StoreError> {
        let authorization = self.bearer("create").await?;
        let url = self.records_url(collection, None)?;

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(record)
            .send()
            .await?;

        let body = Self::json_body(Self::check_status(response).await?).await?;
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::invalid_response("created record has no id"))?;

        debug!(collection = %collection, id = %id, "Created record");
        Ok(CreatedRecord::new(id))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: &EntityRecord,
    ) -> Result<(), StoreError> {
        let authorization = self.bearer("update").await?;
        let url = self.records_url(collection, Some(id))?;

        let response = self
            .client
            .patch(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(patch)
            .send()
            .await?;

        Self::check_status(response).await?;
        debug!(collection = %collection, id = %id, "Updated record");
        Ok(())
    }
}
