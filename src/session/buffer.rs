use chrono::{DateTime, Utc};

use crate::models::{Note, NotePatch, Visibility};

/// Outcome of applying a remote change to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Buffer was clean; the remote state replaced it entirely
    Replaced,
    /// Buffer was dirty; local title/body kept, remote text discarded
    KeptLocalText,
}

/// In-memory working copy of a note's editable fields.
///
/// Invariant: the buffer holds either the last-known-good remote copy, or
/// that copy plus unsaved local keystrokes. It never mixes text from two
/// different remote revisions.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    title: String,
    body: String,
    visibility: Visibility,
    updated_at: DateTime<Utc>,
    dirty: bool,
    last_sent_at: Option<DateTime<Utc>>,
}

impl EditBuffer {
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            body: note.content.clone(),
            visibility: note.visibility(),
            updated_at: note.updated_at,
            dirty: false,
            last_sent_at: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_sent_at(&self) -> Option<DateTime<Utc>> {
        self.last_sent_at
    }

    pub fn edit_title(&mut self, text: impl Into<String>) {
        self.title = text.into();
        self.dirty = true;
    }

    pub fn edit_body(&mut self, text: impl Into<String>) {
        self.body = text.into();
        self.dirty = true;
    }

    pub fn append_body(&mut self, text: &str) {
        self.body.push_str(text);
        self.dirty = true;
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
        self.dirty = true;
    }

    /// Merge a remote change into the buffer.
    ///
    /// Clean buffer: the remote state wins entirely (last-writer-wins at the
    /// record granularity) and the buffer stays clean. Dirty buffer: only the
    /// non-text fields are adopted; local title/body are preserved and the
    /// remote text is discarded. A concurrent remote edit can therefore be
    /// lost while the local user is mid-edit.
    pub fn apply_remote(&mut self, note: &Note) -> MergeOutcome {
        if self.dirty {
            self.visibility = note.visibility();
            self.updated_at = note.updated_at;
            MergeOutcome::KeptLocalText
        } else {
            self.title = note.title.clone();
            self.body = note.content.clone();
            self.visibility = note.visibility();
            self.updated_at = note.updated_at;
            MergeOutcome::Replaced
        }
    }

    /// The patch a persist call sends for the current buffer state
    pub fn patch(&self) -> NotePatch {
        NotePatch {
            title: Some(self.title.clone()),
            content: Some(self.body.clone()),
            is_public: Some(self.visibility.is_public()),
        }
    }

    /// Record a successful persist: the buffer now matches the remote copy
    pub fn mark_saved(&mut self) {
        self.dirty = false;
        self.last_sent_at = Some(Utc::now());
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            title: self.title.clone(),
            body: self.body.clone(),
            visibility: self.visibility,
            dirty: self.dirty,
        }
    }
}

/// Read-only view of the buffer published to observers
#[derive(Debug, Clone, PartialEq)]
pub struct BufferSnapshot {
    pub title: String,
    pub body: String,
    pub visibility: Visibility,
    pub dirty: bool,
}
