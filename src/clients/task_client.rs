use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::models::StoreError;
use crate::stores::TaskInvoker;

/// Invoker for named remote tasks (the platform's deployed functions).
/// JSON in, JSON out; everything behind the name is out of our hands.
pub struct HttpTaskClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTaskClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url: config.functions_endpoint(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl TaskInvoker for HttpTaskClient {
    async fn invoke(
        &self,
        task: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, StoreError> {
        debug!("Invoking task {}", task);
        let url = format!("{}/{}", self.base_url, task);
        let mut request = self.client.post(url).json(&body);
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
        Ok(response.json::<serde_json::Value>().await?)
    }
}
