use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::config::StorageConfig;
use crate::listing::ports::{ImageStore, ImageUpload, StorageError};

use super::BucketLayout;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Supabase-style object storage over its REST API.
pub struct HttpImageStore {
    client: reqwest::Client,
    layout: BucketLayout,
    service_key: String,
}

impl HttpImageStore {
    pub fn new(layout: BucketLayout, service_key: impl Into<String>) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StorageError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            layout,
            service_key: service_key.into(),
        })
    }

    /// `None` when no service key is configured.
    pub fn from_config(config: &StorageConfig) -> Result<Option<Self>, StorageError> {
        match config.service_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => Self::new(BucketLayout::new(&config.url, &config.bucket), key).map(Some),
            None => Ok(None),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.service_key)
    }
}

async fn check(response: reqwest::Response) -> Result<(), StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response.text().await.unwrap_or_default();
    Err(StorageError::Rejected { status: status.as_u16(), message })
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn store_image(&self, upload: ImageUpload) -> Result<String, StorageError> {
        let response = self
            .client
            .post(self.layout.object_url(&upload.path))
            .header(AUTHORIZATION, self.bearer())
            .header(CONTENT_TYPE, upload.content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(upload.bytes)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(?e, "Image upload request failed");
                StorageError::Request(e.to_string())
            })?;

        check(response).await?;
        Ok(self.layout.public_url(&upload.path))
    }

    async fn delete_stored_image(&self, url: &str, folder: &str) -> Result<(), StorageError> {
        let path = self.layout.object_path_in(url, folder)?;

        let response = self
            .client
            .delete(self.layout.object_url(&path))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        check(response).await
    }
}
