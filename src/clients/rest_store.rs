use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::clients::realtime::RealtimeClient;
use crate::config::Config;
use crate::models::{ChangeFilter, Note, NoteDraft, NotePatch, StoreError};
use crate::stores::{ChangeFeed, RecordStore};

/// Record store backed by the platform's REST interface. Rows are addressed
/// PostgREST-style (`id=eq.{uuid}`) and mutations ask for the written row
/// back. Change subscriptions are delegated to the realtime client.
pub struct RestRecordStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    realtime: Arc<RealtimeClient>,
}

impl RestRecordStore {
    pub fn new(config: &Config, realtime: Arc<RealtimeClient>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url: config.rest_endpoint(),
            api_key: config.api_key.clone(),
            realtime,
        }
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("apikey", key).bearer_auth(key),
            None => builder,
        }
    }

    fn notes_url(&self) -> String {
        format!("{}/notes", self.base_url)
    }
}

/// Read the written rows out of a representation response
async fn expect_rows(response: reqwest::Response) -> Result<Vec<Note>, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(StoreError::Status {
            code: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<Vec<Note>>().await?)
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn insert(&self, draft: NoteDraft) -> Result<Note, StoreError> {
        debug!("Creating note for owner {}", draft.owner_id);
        let response = self
            .with_auth(self.client.post(self.notes_url()))
            .header("Prefer", "return=representation")
            .json(&draft)
            .send()
            .await?;
        let rows = expect_rows(response).await?;
        rows.into_iter().next().ok_or(StoreError::NotFound)
    }

    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note, StoreError> {
        let url = format!("{}?id=eq.{}", self.notes_url(), id);
        let response = self
            .with_auth(self.client.patch(url))
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        let rows = expect_rows(response).await?;
        rows.into_iter().next().ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let url = format!("{}?id=eq.{}", self.notes_url(), id);
        let response = self.with_auth(self.client.delete(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                code: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        let url = format!("{}?id=eq.{}&select=*", self.notes_url(), id);
        let response = self.with_auth(self.client.get(url)).send().await?;
        let rows = expect_rows(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn subscribe(&self, filter: ChangeFilter) -> Result<ChangeFeed, StoreError> {
        self.realtime.subscribe_changes(filter).await
    }
}
