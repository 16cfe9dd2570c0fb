//! Interfaces to the managed backend. The session and services only see these
//! traits; concrete clients live in `crate::clients` and tests use in-memory
//! fakes.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::models::{
    ChangeFilter, Note, NoteDraft, NotePatch, PresenceEntry, RecordEvent, StoreError,
};

/// Cancellation handle for an open subscription. Closing is explicit and
/// idempotent; dropping the handle closes too, so teardown is deterministic
/// without relying on task lifetimes.
pub struct FeedHandle {
    shutdown: Option<oneshot::Sender<()>>,
}

impl FeedHandle {
    pub fn new(shutdown: oneshot::Sender<()>) -> Self {
        Self {
            shutdown: Some(shutdown),
        }
    }

    /// A handle with nothing to signal
    pub fn detached() -> Self {
        Self { shutdown: None }
    }

    pub fn close(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// A stream of change notifications for records matching a filter.
/// Events arrive in the order the transport delivered them. `recv` returning
/// `None` after a successful subscribe means the transport dropped.
pub struct ChangeFeed {
    events: mpsc::Receiver<RecordEvent>,
    handle: FeedHandle,
}

impl ChangeFeed {
    pub fn new(events: mpsc::Receiver<RecordEvent>, handle: FeedHandle) -> Self {
        Self { events, handle }
    }

    pub async fn recv(&mut self) -> Option<RecordEvent> {
        self.events.recv().await
    }

    pub fn close(&mut self) {
        self.handle.close();
        self.events.close();
    }
}

/// A stream of full presence roster snapshots for one note's channel
pub struct PresenceFeed {
    rosters: mpsc::Receiver<Vec<PresenceEntry>>,
    handle: FeedHandle,
}

impl PresenceFeed {
    pub fn new(rosters: mpsc::Receiver<Vec<PresenceEntry>>, handle: FeedHandle) -> Self {
        Self { rosters, handle }
    }

    pub async fn recv(&mut self) -> Option<Vec<PresenceEntry>> {
        self.rosters.recv().await
    }

    pub fn close(&mut self) {
        self.handle.close();
        self.rosters.close();
    }
}

/// CRUD plus a change feed over note records. Access policy is enforced by
/// the platform; implementations only attach credentials and report
/// rejections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, draft: NoteDraft) -> Result<Note, StoreError>;

    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Note>, StoreError>;

    /// Open a change subscription. Delivery order and delivery guarantees are
    /// whatever the platform provides.
    async fn subscribe(&self, filter: ChangeFilter) -> Result<ChangeFeed, StoreError>;
}

/// A presence-capable channel scoped to one note
#[async_trait]
pub trait PresenceChannel: Send + Sync {
    /// Announce `me` as present on the note's channel and receive roster
    /// snapshots until the feed is closed.
    async fn join(&self, note_id: Uuid, me: PresenceEntry) -> Result<PresenceFeed, StoreError>;
}

/// Upload-only blob storage with public URLs
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `path`, returning the stored path
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError>;

    /// Publicly reachable URL for a stored path
    fn public_url(&self, path: &str) -> String;
}

/// Named remote tasks with JSON in and out
#[async_trait]
pub trait TaskInvoker: Send + Sync {
    async fn invoke(
        &self,
        task: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, StoreError>;
}
