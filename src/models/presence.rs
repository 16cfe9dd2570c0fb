use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A collaborator currently viewing the same note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresenceEntry {
    pub user_id: Uuid,
    pub email: String,
    pub online_at: DateTime<Utc>,
}

impl PresenceEntry {
    pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            online_at: Utc::now(),
        }
    }
}
