use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{
    ChangeFilter, Note, PresenceEntry, RecordEvent, SessionError, Visibility,
};
use crate::session::buffer::{BufferSnapshot, EditBuffer, MergeOutcome};
use crate::session::roster::PresenceRoster;
use crate::stores::{ChangeFeed, PresenceChannel, PresenceFeed, RecordStore};

/// Quiet period after the last local edit before the buffer is persisted.
/// Bounds write amplification for fast typists while keeping latency low.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Capacity of the command queue between a handle and its session task
const COMMAND_QUEUE: usize = 64;

/// Save indicator derived from the dirty flag and the last persist outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Saved,
    Unsaved,
    Saving,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Live,
    /// A feed closed after a successful start; the session does not reconnect
    Dropped,
    Stopped,
}

/// Observable state of a session, published on every transition
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub save: SaveState,
    pub transport: TransportState,
    /// Set when the note was deleted by another writer
    pub remote_deleted: bool,
}

enum Command {
    EditTitle(String),
    EditBody(String),
    AppendBody(String, oneshot::Sender<Result<(), SessionError>>),
    SetVisibility(Visibility, oneshot::Sender<Result<(), SessionError>>),
    Flush(oneshot::Sender<Result<(), SessionError>>),
    Stop(oneshot::Sender<()>),
}

/// Handle to a collaborative note session.
///
/// All state lives in a single spawned task; local edits, remote change
/// notifications, presence syncs and the debounce timer are serialized onto
/// that task's event loop, so no handler ever observes another half-applied.
pub struct NoteSession {
    note_id: Uuid,
    owner_id: Uuid,
    commands: mpsc::Sender<Command>,
    buffer_rx: watch::Receiver<BufferSnapshot>,
    roster_rx: watch::Receiver<Vec<PresenceEntry>>,
    status_rx: watch::Receiver<SessionStatus>,
}

impl NoteSession {
    /// Open the change and presence subscriptions for `note` and spawn the
    /// session task. Fails with `SessionError::Subscription` if either
    /// channel cannot be opened; nothing is retried internally.
    pub async fn start(
        store: Arc<dyn RecordStore>,
        presence: Arc<dyn PresenceChannel>,
        note: Note,
        identity: PresenceEntry,
    ) -> Result<NoteSession, SessionError> {
        Self::start_with_debounce(store, presence, note, identity, DEBOUNCE_WINDOW).await
    }

    /// Like `start` with a custom debounce window (for testing)
    pub async fn start_with_debounce(
        store: Arc<dyn RecordStore>,
        presence: Arc<dyn PresenceChannel>,
        note: Note,
        identity: PresenceEntry,
        debounce: Duration,
    ) -> Result<NoteSession, SessionError> {
        let changes = store
            .subscribe(ChangeFilter::Note(note.id))
            .await
            .map_err(SessionError::Subscription)?;
        let presence_feed = presence
            .join(note.id, identity.clone())
            .await
            .map_err(SessionError::Subscription)?;

        let buffer = EditBuffer::from_note(&note);
        let status = SessionStatus {
            save: SaveState::Saved,
            transport: TransportState::Live,
            remote_deleted: false,
        };

        let (buffer_tx, buffer_rx) = watch::channel(buffer.snapshot());
        let (roster_tx, roster_rx) = watch::channel(Vec::new());
        let (status_tx, status_rx) = watch::channel(status.clone());
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);

        let worker = SessionWorker {
            note_id: note.id,
            store,
            buffer,
            roster: PresenceRoster::new(identity.user_id),
            changes,
            presence: presence_feed,
            commands: cmd_rx,
            buffer_tx,
            roster_tx,
            status_tx,
            status,
            debounce,
            pending: None,
        };
        tokio::spawn(worker.run());

        info!("Session started for note {}", note.id);
        Ok(NoteSession {
            note_id: note.id,
            owner_id: note.owner_id,
            commands: cmd_tx,
            buffer_rx,
            roster_rx,
            status_rx,
        })
    }

    pub fn note_id(&self) -> Uuid {
        self.note_id
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    /// Apply a title edit to the local buffer and schedule a debounced
    /// persist. Always succeeds locally; edits after stop are dropped.
    pub async fn edit_title(&self, text: impl Into<String>) {
        if self
            .commands
            .send(Command::EditTitle(text.into()))
            .await
            .is_err()
        {
            debug!("Title edit ignored; session for note {} stopped", self.note_id);
        }
    }

    /// Apply a body edit to the local buffer and schedule a debounced persist
    pub async fn edit_body(&self, text: impl Into<String>) {
        if self
            .commands
            .send(Command::EditBody(text.into()))
            .await
            .is_err()
        {
            debug!("Body edit ignored; session for note {} stopped", self.note_id);
        }
    }

    /// Append to the body and persist immediately. Used for discrete
    /// non-text-driven mutations (image insertion, generated appends) that
    /// must not wait out the debounce window.
    pub async fn append_body(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.request(|reply| Command::AppendBody(text.into(), reply))
            .await
    }

    /// Change visibility and persist immediately
    pub async fn set_visibility(&self, visibility: Visibility) -> Result<(), SessionError> {
        self.request(|reply| Command::SetVisibility(visibility, reply))
            .await
    }

    /// Cancel any pending debounce timer and persist the buffer now if it is
    /// dirty. On failure the buffer stays dirty so a later flush can retry.
    pub async fn flush(&self) -> Result<(), SessionError> {
        self.request(Command::Flush).await
    }

    /// Tear the session down: cancel the pending timer, close both
    /// subscriptions and clear the roster. Idempotent.
    pub async fn stop(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Stop(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Fire-and-forget stop for callers that cannot await (cache eviction)
    pub fn request_stop(&self) {
        let (tx, _rx) = oneshot::channel();
        let _ = self.commands.try_send(Command::Stop(tx));
    }

    pub fn is_stopped(&self) -> bool {
        self.commands.is_closed()
            || self.status_rx.borrow().transport == TransportState::Stopped
    }

    /// Current buffer contents
    pub fn buffer(&self) -> BufferSnapshot {
        self.buffer_rx.borrow().clone()
    }

    /// Collaborators currently on this note, excluding the local identity
    pub fn roster(&self) -> Vec<PresenceEntry> {
        self.roster_rx.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    /// Watch handles for observers that want change notifications
    pub fn buffer_watch(&self) -> watch::Receiver<BufferSnapshot> {
        self.buffer_rx.clone()
    }

    pub fn roster_watch(&self) -> watch::Receiver<Vec<PresenceEntry>> {
        self.roster_rx.clone()
    }

    pub fn status_watch(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    async fn request(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<(), SessionError>>) -> Command,
    ) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SessionError::Stopped)?;
        rx.await.map_err(|_| SessionError::Stopped)?
    }
}

struct SessionWorker {
    note_id: Uuid,
    store: Arc<dyn RecordStore>,
    buffer: EditBuffer,
    roster: PresenceRoster,
    changes: ChangeFeed,
    presence: PresenceFeed,
    commands: mpsc::Receiver<Command>,
    buffer_tx: watch::Sender<BufferSnapshot>,
    roster_tx: watch::Sender<Vec<PresenceEntry>>,
    status_tx: watch::Sender<SessionStatus>,
    status: SessionStatus,
    debounce: Duration,
    /// Deadline of the armed debounce timer; None means no write is scheduled
    pending: Option<Instant>,
}

impl SessionWorker {
    async fn run(mut self) {
        let mut changes_open = true;
        let mut presence_open = true;

        loop {
            // The timer arm is disabled while no write is scheduled
            let deadline = self
                .pending
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(Command::EditTitle(text)) => {
                            self.buffer.edit_title(text);
                            self.on_local_edit();
                        }
                        Some(Command::EditBody(text)) => {
                            self.buffer.edit_body(text);
                            self.on_local_edit();
                        }
                        Some(Command::AppendBody(text, reply)) => {
                            self.buffer.append_body(&text);
                            self.publish_buffer();
                            let result = self.flush().await;
                            let _ = reply.send(result);
                        }
                        Some(Command::SetVisibility(visibility, reply)) => {
                            self.buffer.set_visibility(visibility);
                            self.publish_buffer();
                            let result = self.flush().await;
                            let _ = reply.send(result);
                        }
                        Some(Command::Flush(reply)) => {
                            let result = self.flush().await;
                            let _ = reply.send(result);
                        }
                        Some(Command::Stop(reply)) => {
                            let _ = reply.send(());
                            break;
                        }
                        // Every handle dropped; nothing can reach us anymore
                        None => break,
                    }
                }
                event = self.changes.recv(), if changes_open => {
                    match event {
                        Some(event) => self.on_remote_change(event),
                        None => {
                            changes_open = false;
                            self.on_transport_drop("change feed");
                        }
                    }
                }
                snapshot = self.presence.recv(), if presence_open => {
                    match snapshot {
                        Some(entries) => {
                            self.roster.sync(entries);
                            self.publish_roster();
                        }
                        None => {
                            presence_open = false;
                            self.roster.clear();
                            self.publish_roster();
                            self.on_transport_drop("presence channel");
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline), if self.pending.is_some() => {
                    self.pending = None;
                    if let Err(e) = self.persist().await {
                        warn!("Debounced save for note {} failed: {}", self.note_id, e);
                    }
                }
            }
        }

        self.teardown();
    }

    fn on_local_edit(&mut self) {
        // Each edit resets the window; only the last edit of a burst fires
        self.pending = Some(Instant::now() + self.debounce);
        self.publish_buffer();
        self.set_save(SaveState::Unsaved);
    }

    fn on_remote_change(&mut self, event: RecordEvent) {
        match event {
            RecordEvent::Inserted(note) | RecordEvent::Updated(note) => {
                match self.buffer.apply_remote(&note) {
                    MergeOutcome::Replaced => {
                        // Buffer was just overwritten; nothing local is left
                        // to persist, so drop any pending timer
                        self.pending = None;
                    }
                    MergeOutcome::KeptLocalText => {
                        debug!(
                            "Kept in-flight local text for note {}; remote text discarded",
                            self.note_id
                        );
                    }
                }
                self.publish_buffer();
            }
            RecordEvent::Deleted(id) => {
                info!("Note {} was deleted remotely", id);
                self.pending = None;
                self.status.remote_deleted = true;
                self.publish_status();
            }
        }
    }

    fn on_transport_drop(&mut self, channel: &str) {
        warn!("Session for note {} lost its {}", self.note_id, channel);
        if self.status.transport == TransportState::Live {
            self.status.transport = TransportState::Dropped;
            self.publish_status();
        }
    }

    async fn flush(&mut self) -> Result<(), SessionError> {
        self.pending = None;
        if self.buffer.is_dirty() {
            self.persist().await
        } else {
            Ok(())
        }
    }

    async fn persist(&mut self) -> Result<(), SessionError> {
        self.set_save(SaveState::Saving);
        match self.store.update(self.note_id, self.buffer.patch()).await {
            Ok(_) => {
                self.buffer.mark_saved();
                self.publish_buffer();
                self.set_save(SaveState::Saved);
                Ok(())
            }
            Err(e) => {
                // Buffer stays dirty; a later flush retries
                error!("Failed to persist note {}: {}", self.note_id, e);
                self.set_save(SaveState::Failed);
                Err(SessionError::Persist(e))
            }
        }
    }

    fn teardown(&mut self) {
        self.pending = None;
        self.changes.close();
        self.presence.close();
        self.roster.clear();
        self.publish_roster();
        self.status.transport = TransportState::Stopped;
        self.publish_status();
        info!("Session stopped for note {}", self.note_id);
    }

    fn set_save(&mut self, save: SaveState) {
        if self.status.save != save {
            self.status.save = save;
            self.publish_status();
        }
    }

    fn publish_buffer(&self) {
        let _ = self.buffer_tx.send(self.buffer.snapshot());
    }

    fn publish_roster(&self) {
        let _ = self.roster_tx.send(self.roster.entries().to_vec());
    }

    fn publish_status(&self) {
        let _ = self.status_tx.send(self.status.clone());
    }
}
