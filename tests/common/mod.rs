#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, oneshot, Mutex};
use uuid::Uuid;

use collabnote::models::{
    ChangeFilter, Note, NoteDraft, NotePatch, PresenceEntry, RecordEvent, StoreError,
};
use collabnote::session::NoteSession;
use collabnote::stores::{
    BlobStore, ChangeFeed, FeedHandle, PresenceChannel, PresenceFeed, RecordStore, TaskInvoker,
};

pub fn sample_note(owner_id: Uuid) -> Note {
    Note {
        id: Uuid::new_v4(),
        title: "Untitled Note".to_string(),
        content: String::new(),
        owner_id,
        is_public: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn identity(email: &str) -> PresenceEntry {
    PresenceEntry::new(Uuid::new_v4(), email)
}

/// In-memory stand-in for the whole platform: record store, presence
/// channel, blob store and task invoker in one struct, with knobs for
/// injecting failures and observing calls.
pub struct FakePlatform {
    pub notes: Mutex<Vec<Note>>,
    pub updates: Mutex<Vec<(Uuid, NotePatch)>>,
    pub uploads: Mutex<Vec<String>>,
    pub invocations: Mutex<Vec<(String, serde_json::Value)>>,
    pub tracked: Mutex<Vec<PresenceEntry>>,
    task_results: Mutex<HashMap<String, serde_json::Value>>,
    change_tx: Mutex<Option<mpsc::Sender<RecordEvent>>>,
    roster_tx: Mutex<Option<mpsc::Sender<Vec<PresenceEntry>>>>,
    fail_next_update: AtomicBool,
    fail_subscribe: AtomicBool,
    closed_feeds: Arc<AtomicUsize>,
}

impl FakePlatform {
    pub fn new(notes: Vec<Note>) -> Arc<Self> {
        Arc::new(Self {
            notes: Mutex::new(notes),
            updates: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            invocations: Mutex::new(Vec::new()),
            tracked: Mutex::new(Vec::new()),
            task_results: Mutex::new(HashMap::new()),
            change_tx: Mutex::new(None),
            roster_tx: Mutex::new(None),
            fail_next_update: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            closed_feeds: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub async fn update_count(&self) -> usize {
        self.updates.lock().await.len()
    }

    pub async fn last_update(&self) -> Option<NotePatch> {
        self.updates.lock().await.last().map(|(_, patch)| patch.clone())
    }

    pub fn fail_next_update(&self) {
        self.fail_next_update.store(true, Ordering::SeqCst);
    }

    pub fn fail_subscribe(&self) {
        self.fail_subscribe.store(true, Ordering::SeqCst);
    }

    pub fn closed_feeds(&self) -> usize {
        self.closed_feeds.load(Ordering::SeqCst)
    }

    pub async fn set_task_result(&self, task: &str, result: serde_json::Value) {
        self.task_results.lock().await.insert(task.to_string(), result);
    }

    /// Deliver a change notification to the subscribed session
    pub async fn push_change(&self, event: RecordEvent) {
        if let Some(tx) = self.change_tx.lock().await.as_ref() {
            tx.send(event).await.expect("change feed should be open");
        }
    }

    /// Deliver a full presence roster snapshot
    pub async fn push_roster(&self, entries: Vec<PresenceEntry>) {
        if let Some(tx) = self.roster_tx.lock().await.as_ref() {
            tx.send(entries).await.expect("presence feed should be open");
        }
    }

    /// Simulate the transport dropping the change feed
    pub async fn drop_change_feed(&self) {
        *self.change_tx.lock().await = None;
    }

    /// Simulate the transport dropping the presence channel
    pub async fn drop_presence_feed(&self) {
        *self.roster_tx.lock().await = None;
    }

    fn counted_handle(&self) -> FeedHandle {
        let (tx, rx) = oneshot::channel();
        let closed = self.closed_feeds.clone();
        tokio::spawn(async move {
            let _ = rx.await;
            closed.fetch_add(1, Ordering::SeqCst);
        });
        FeedHandle::new(tx)
    }
}

#[async_trait]
impl RecordStore for FakePlatform {
    async fn insert(&self, draft: NoteDraft) -> Result<Note, StoreError> {
        let note = Note {
            id: Uuid::new_v4(),
            title: draft.title,
            content: String::new(),
            owner_id: draft.owner_id,
            is_public: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.notes.lock().await.push(note.clone());
        Ok(note)
    }

    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note, StoreError> {
        if self.fail_next_update.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Status {
                code: 500,
                message: "backend unavailable".to_string(),
            });
        }

        let mut notes = self.notes.lock().await;
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(title) = &patch.title {
            note.title = title.clone();
        }
        if let Some(content) = &patch.content {
            note.content = content.clone();
        }
        if let Some(is_public) = patch.is_public {
            note.is_public = is_public;
        }
        note.updated_at = Utc::now();
        let updated = note.clone();
        drop(notes);

        self.updates.lock().await.push((id, patch));
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.notes.lock().await.retain(|n| n.id != id);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        Ok(self.notes.lock().await.iter().find(|n| n.id == id).cloned())
    }

    async fn subscribe(&self, _filter: ChangeFilter) -> Result<ChangeFeed, StoreError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        let (tx, rx) = mpsc::channel(64);
        *self.change_tx.lock().await = Some(tx);
        Ok(ChangeFeed::new(rx, self.counted_handle()))
    }
}

#[async_trait]
impl PresenceChannel for FakePlatform {
    async fn join(&self, _note_id: Uuid, me: PresenceEntry) -> Result<PresenceFeed, StoreError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        let (tx, rx) = mpsc::channel(64);
        *self.roster_tx.lock().await = Some(tx);
        self.tracked.lock().await.push(me);
        Ok(PresenceFeed::new(rx, self.counted_handle()))
    }
}

#[async_trait]
impl BlobStore for FakePlatform {
    async fn upload(&self, path: &str, _bytes: Vec<u8>) -> Result<String, StoreError> {
        self.uploads.lock().await.push(path.to_string());
        Ok(path.to_string())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.test/{}", path)
    }
}

#[async_trait]
impl TaskInvoker for FakePlatform {
    async fn invoke(
        &self,
        task: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, StoreError> {
        self.invocations.lock().await.push((task.to_string(), body));
        match self.task_results.lock().await.get(task) {
            Some(result) => Ok(result.clone()),
            None => Err(StoreError::Status {
                code: 404,
                message: format!("no such task {}", task),
            }),
        }
    }
}

pub async fn start_session(
    platform: &Arc<FakePlatform>,
    note: Note,
    me: PresenceEntry,
) -> NoteSession {
    NoteSession::start(platform.clone(), platform.clone(), note, me)
        .await
        .expect("session should start")
}
