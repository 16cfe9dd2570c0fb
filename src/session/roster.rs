use uuid::Uuid;

use crate::models::PresenceEntry;

/// Volatile set of collaborators present on one note's channel.
///
/// Rebuilt wholesale from each sync snapshot rather than patched
/// incrementally; the local identity is never part of the roster. Nothing
/// here is ever persisted.
#[derive(Debug)]
pub struct PresenceRoster {
    local_user_id: Uuid,
    entries: Vec<PresenceEntry>,
}

impl PresenceRoster {
    pub fn new(local_user_id: Uuid) -> Self {
        Self {
            local_user_id,
            entries: Vec::new(),
        }
    }

    /// Replace the roster with the transport's latest full snapshot,
    /// dropping the local identity and duplicate collaborator ids.
    pub fn sync(&mut self, snapshot: Vec<PresenceEntry>) {
        let mut entries: Vec<PresenceEntry> = Vec::with_capacity(snapshot.len());
        for entry in snapshot {
            if entry.user_id == self.local_user_id {
                continue;
            }
            if entries.iter().any(|e| e.user_id == entry.user_id) {
                continue;
            }
            entries.push(entry);
        }
        self.entries = entries;
    }

    pub fn entries(&self) -> &[PresenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
