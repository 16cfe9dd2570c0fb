use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;
use uuid::Uuid;

use crate::session::NoteSession;

/// Default idle eviction for cached sessions
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Cache of live sessions keyed by note id, so re-opening a note reuses the
/// running session instead of opening a second pair of subscriptions.
/// Entries idle for five minutes are evicted and their session stopped.
pub struct SessionRegistry {
    sessions: Cache<Uuid, Arc<NoteSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_idle_timeout(IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(1024)
            .time_to_idle(idle)
            .eviction_listener(|id: Arc<Uuid>, session: Arc<NoteSession>, cause| {
                debug!("Evicting session for note {} ({:?})", id, cause);
                session.request_stop();
            })
            .build();
        Self { sessions }
    }

    /// Live session for a note, if one is cached. Stopped sessions are
    /// dropped from the cache rather than handed out.
    pub async fn get(&self, note_id: Uuid) -> Option<Arc<NoteSession>> {
        match self.sessions.get(&note_id).await {
            Some(session) if !session.is_stopped() => Some(session),
            Some(_) => {
                self.sessions.invalidate(&note_id).await;
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, session: Arc<NoteSession>) {
        self.sessions.insert(session.note_id(), session).await;
    }

    /// Stop and forget the session for a note
    pub async fn remove(&self, note_id: Uuid) {
        if let Some(session) = self.sessions.get(&note_id).await {
            session.stop().await;
        }
        self.sessions.invalidate(&note_id).await;
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
