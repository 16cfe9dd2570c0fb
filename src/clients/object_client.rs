use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::config::Config;
use crate::models::StoreError;
use crate::stores::BlobStore;

/// Blob store backed by the platform's object storage. Uploads go into one
/// configured bucket; reads go through public URLs, so the store itself is
/// write-only from this client's point of view.
pub struct HttpBlobStore {
    client: Client,
    base_url: String,
    bucket: String,
    api_key: Option<String>,
}

impl HttpBlobStore {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url: config.storage_endpoint(),
            bucket: config.storage_bucket.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        let url = format!("{}/object/{}/{}", self.base_url, self.bucket, path);
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/octet-stream")
            .body(bytes);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                code: status.as_u16(),
                message,
            });
        }

        info!("Uploaded {} to bucket {}", path, self.bucket);
        Ok(path.to_string())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, path)
    }
}
