use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Note, PresenceEntry, RecordEvent};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub topic: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrackMessage {
    pub topic: String,
    pub entry: PresenceEntry,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LeaveMessage {
    pub topic: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMessage {
    pub topic: String,
    pub event: ChangeKind,
    /// The new row, present for insert and update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Note>,
    /// Id of the removed row, present for delete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_id: Option<Uuid>,
}

impl ChangeMessage {
    /// Convert the wire shape into a feed event. Malformed messages map to None.
    pub fn into_event(self) -> Option<RecordEvent> {
        match self.event {
            ChangeKind::Insert => self.record.map(RecordEvent::Inserted),
            ChangeKind::Update => self.record.map(RecordEvent::Updated),
            ChangeKind::Delete => self.old_id.map(RecordEvent::Deleted),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMessage {
    pub topic: String,
    pub entries: Vec<PresenceEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChannelErrorMessage {
    pub message: String,
}

/// Messages sent to the realtime endpoint
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "track")]
    Track(TrackMessage),
    #[serde(rename = "heartbeat")]
    Heartbeat,
    #[serde(rename = "leave")]
    Leave(LeaveMessage),
}

/// Messages received from the realtime endpoint
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "joined")]
    Joined(JoinMessage),
    #[serde(rename = "change")]
    Change(ChangeMessage),
    #[serde(rename = "presence")]
    Presence(PresenceMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
    #[serde(rename = "error")]
    Error(ChannelErrorMessage),
}
