use crate::models::{Note, RecordEvent};

/// Live view of a user's notes, kept in sync from an owner-scoped change
/// feed: inserts are prepended, updates replace the matching entry, deletes
/// remove it. Purely local state; the feed itself is driven by the caller.
#[derive(Debug, Default)]
pub struct NoteList {
    notes: Vec<Note>,
}

impl NoteList {
    pub fn new(initial: Vec<Note>) -> Self {
        Self { notes: initial }
    }

    /// Reconcile one change event into the list
    pub fn apply(&mut self, event: RecordEvent) {
        match event {
            RecordEvent::Inserted(note) => {
                self.notes.retain(|n| n.id != note.id);
                self.notes.insert(0, note);
            }
            RecordEvent::Updated(note) => {
                if let Some(slot) = self.notes.iter_mut().find(|n| n.id == note.id) {
                    *slot = note;
                }
            }
            RecordEvent::Deleted(id) => {
                self.notes.retain(|n| n.id != id);
            }
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Case-insensitive title search for the local filter box
    pub fn filter_by_title(&self, query: &str) -> Vec<&Note> {
        let query = query.to_lowercase();
        self.notes
            .iter()
            .filter(|n| n.title.to_lowercase().contains(&query))
            .collect()
    }
}
