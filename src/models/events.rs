use uuid::Uuid;

use crate::models::Note;

/// A change notification delivered by the record store's feed
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    Inserted(Note),
    Updated(Note),
    Deleted(Uuid),
}

impl RecordEvent {
    /// The id of the record the event is about
    pub fn note_id(&self) -> Uuid {
        match self {
            RecordEvent::Inserted(note) | RecordEvent::Updated(note) => note.id,
            RecordEvent::Deleted(id) => *id,
        }
    }
}

/// Scope of a change subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFilter {
    /// All events for a single note
    Note(Uuid),
    /// All events for every note owned by an identity
    Owner(Uuid),
}

impl ChangeFilter {
    /// Channel topic the filter maps to
    pub fn topic(&self) -> String {
        match self {
            ChangeFilter::Note(id) => format!("note:{}", id),
            ChangeFilter::Owner(id) => format!("notes:owner:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_topics() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(
            ChangeFilter::Note(id).topic(),
            "note:550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(
            ChangeFilter::Owner(id).topic(),
            "notes:owner:550e8400-e29b-41d4-a716-446655440000"
        );
    }
}
