use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::clients::{HttpBlobStore, HttpTaskClient, RealtimeClient, RestRecordStore};
use crate::config::Config;
use crate::models::{
    ChangeFilter, Note, NoteDraft, PresenceEntry, SearchHit, ServiceError, SessionError,
    StoreError, Visibility,
};
use crate::session::{NoteSession, SessionRegistry};
use crate::stores::{BlobStore, ChangeFeed, PresenceChannel, RecordStore, TaskInvoker};

/// High-level note operations over the collaborator interfaces. Everything
/// here is thin wiring: the platform does the work, the session keeps the
/// local copy consistent.
pub struct NoteService {
    store: Arc<dyn RecordStore>,
    presence: Arc<dyn PresenceChannel>,
    blobs: Arc<dyn BlobStore>,
    tasks: Arc<dyn TaskInvoker>,
    sessions: SessionRegistry,
}

#[derive(Deserialize)]
struct SummaryResponse {
    summary: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    notes: Vec<SearchHit>,
}

impl NoteService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        presence: Arc<dyn PresenceChannel>,
        blobs: Arc<dyn BlobStore>,
        tasks: Arc<dyn TaskInvoker>,
    ) -> Self {
        Self {
            store,
            presence,
            blobs,
            tasks,
            sessions: SessionRegistry::new(),
        }
    }

    /// Wire the service to the platform's default HTTP and websocket clients
    pub fn from_config(config: &Config) -> Self {
        let realtime = Arc::new(RealtimeClient::new(config));
        let store = Arc::new(RestRecordStore::new(config, realtime.clone()));
        let blobs = Arc::new(HttpBlobStore::new(config));
        let tasks = Arc::new(HttpTaskClient::new(config));
        Self::new(store, realtime, blobs, tasks)
    }

    /// Create a fresh note: default title, empty body
    pub async fn create_note(&self, owner: Uuid) -> Result<Note, StoreError> {
        let note = self.store.insert(NoteDraft::untitled(owner)).await?;
        info!("Created note {} for {}", note.id, owner);
        Ok(note)
    }

    /// Open a collaborative session on a note, reusing the live session if
    /// the note is already open
    pub async fn open_note(
        &self,
        id: Uuid,
        identity: PresenceEntry,
    ) -> Result<Arc<NoteSession>, ServiceError> {
        if let Some(session) = self.sessions.get(id).await {
            return Ok(session);
        }

        let note = self
            .store
            .get(id)
            .await?
            .ok_or(ServiceError::Store(StoreError::NotFound))?;
        let session = Arc::new(
            NoteSession::start(
                self.store.clone(),
                self.presence.clone(),
                note,
                identity,
            )
            .await?,
        );
        self.sessions.insert(session.clone()).await;
        Ok(session)
    }

    /// Stop and forget the session for a note
    pub async fn close_note(&self, id: Uuid) {
        self.sessions.remove(id).await;
    }

    /// Delete a note, stopping any live session on it first
    pub async fn delete_note(&self, id: Uuid) -> Result<(), StoreError> {
        self.sessions.remove(id).await;
        self.store.delete(id).await?;
        info!("Deleted note {}", id);
        Ok(())
    }

    /// Toggle a note's visibility; persisted immediately, not debounced
    pub async fn set_visibility(
        &self,
        session: &NoteSession,
        visibility: Visibility,
    ) -> Result<(), SessionError> {
        session.set_visibility(visibility).await
    }

    /// Upload an image and append a markdown link to the note body. The
    /// append is persisted immediately, like every discrete mutation.
    pub async fn insert_image(
        &self,
        session: &NoteSession,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ServiceError> {
        let ext = file_name.rsplit('.').next().unwrap_or("bin");
        let path = format!("{}/{}.{}", session.owner_id(), Uuid::new_v4(), ext);

        let stored = self.blobs.upload(&path, bytes).await?;
        let url = self.blobs.public_url(&stored);
        session.append_body(format!("\n\n![Image]({})\n", url)).await?;
        Ok(url)
    }

    /// Ask the summarize task for an analysis of the note and append it to
    /// the body, separated from the user's own text
    pub async fn summarize(&self, session: &NoteSession) -> Result<String, ServiceError> {
        let result = self
            .tasks
            .invoke("summarize-note", json!({ "noteId": session.note_id() }))
            .await?;
        let parsed: SummaryResponse =
            serde_json::from_value(result).map_err(StoreError::Decode)?;

        session
            .append_body(format!("\n\n---\n{}\n", parsed.summary))
            .await?;
        Ok(parsed.summary)
    }

    /// Submit a note's content for embedding so it shows up in semantic search
    pub async fn index_note(&self, id: Uuid, content: &str) -> Result<(), StoreError> {
        self.tasks
            .invoke(
                "generate-embedding",
                json!({ "noteId": id, "content": content }),
            )
            .await?;
        info!("Indexed note {}", id);
        Ok(())
    }

    /// Semantic search across the user's notes
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, StoreError> {
        let result = self
            .tasks
            .invoke("search-notes", json!({ "query": query }))
            .await?;
        let parsed: SearchResponse = serde_json::from_value(result).map_err(StoreError::Decode)?;
        Ok(parsed.notes)
    }

    /// Change feed over every note owned by an identity, for dashboard views
    pub async fn subscribe_owner(&self, owner: Uuid) -> Result<ChangeFeed, StoreError> {
        self.store.subscribe(ChangeFilter::Owner(owner)).await
    }
}
