use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shared note record as stored by the platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub owner_id: Uuid,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn visibility(&self) -> Visibility {
        if self.is_public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

/// Whether a note is readable by everyone or by its owner only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        self == Visibility::Public
    }
}

/// Fields for creating a note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub owner_id: Uuid,
}

impl NoteDraft {
    /// A fresh note the way the dashboard creates one: default title, empty body
    pub fn untitled(owner_id: Uuid) -> Self {
        Self {
            title: "Untitled Note".to_string(),
            owner_id,
        }
    }
}

/// Partial update sent to the record store. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// A semantic search result returned by the search task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub similarity: Option<f64>,
}
