use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    ChangeFilter, ClientMessage, JoinMessage, LeaveMessage, PresenceEntry, RecordEvent,
    ServerMessage, StoreError, TrackMessage,
};
use crate::stores::{ChangeFeed, FeedHandle, PresenceChannel, PresenceFeed};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const FEED_BUFFER: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Client for the platform's realtime channels. One websocket is opened per
/// subscription so each feed has its own deterministic teardown.
pub struct RealtimeClient {
    url: String,
    api_key: Option<String>,
}

impl RealtimeClient {
    pub fn new(config: &Config) -> Self {
        Self {
            url: config.realtime_endpoint(),
            api_key: config.api_key.clone(),
        }
    }

    /// Open a change subscription for records matching the filter
    pub async fn subscribe_changes(&self, filter: ChangeFilter) -> Result<ChangeFeed, StoreError> {
        let topic = filter.topic();
        let (write, read) = self.open_channel(&topic, None).await?;

        let (event_tx, event_rx) = mpsc::channel(FEED_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(run_channel(
            topic,
            write,
            read,
            shutdown_rx,
            FeedSink::Changes(event_tx),
        ));
        Ok(ChangeFeed::new(event_rx, FeedHandle::new(shutdown_tx)))
    }

    /// Join a note's presence channel, announcing `me` as present
    pub async fn join_presence(
        &self,
        note_id: Uuid,
        me: PresenceEntry,
    ) -> Result<PresenceFeed, StoreError> {
        let topic = ChangeFilter::Note(note_id).topic();
        let (write, read) = self.open_channel(&topic, Some(me)).await?;

        let (roster_tx, roster_rx) = mpsc::channel(FEED_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(run_channel(
            topic,
            write,
            read,
            shutdown_rx,
            FeedSink::Presence(roster_tx),
        ));
        Ok(PresenceFeed::new(roster_rx, FeedHandle::new(shutdown_tx)))
    }

    /// Connect, join the topic and wait for the server's ack
    async fn open_channel(
        &self,
        topic: &str,
        track: Option<PresenceEntry>,
    ) -> Result<(WsWriter, WsReader), StoreError> {
        let url = match &self.api_key {
            Some(key) => format!("{}/websocket?apikey={}", self.url, key),
            None => format!("{}/websocket", self.url),
        };

        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let (mut write, mut read) = stream.split();

        send_json(
            &mut write,
            &ClientMessage::Join(JoinMessage {
                topic: topic.to_string(),
            }),
        )
        .await?;
        if let Some(entry) = track {
            send_json(
                &mut write,
                &ClientMessage::Track(TrackMessage {
                    topic: topic.to_string(),
                    entry,
                }),
            )
            .await?;
        }

        await_join_ack(&mut read, topic).await?;
        info!("Joined realtime channel {}", topic);
        Ok((write, read))
    }
}

#[async_trait]
impl PresenceChannel for RealtimeClient {
    async fn join(&self, note_id: Uuid, me: PresenceEntry) -> Result<PresenceFeed, StoreError> {
        self.join_presence(note_id, me).await
    }
}

async fn send_json(write: &mut WsWriter, msg: &ClientMessage) -> Result<(), StoreError> {
    let json = serde_json::to_string(msg)?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| StoreError::Transport(e.to_string()))
}

/// Read until the server acks the join. Anything else arriving first is not
/// ours yet and is skipped.
async fn await_join_ack(read: &mut WsReader, topic: &str) -> Result<(), StoreError> {
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(txt.as_str()) {
                Ok(ServerMessage::Joined(ack)) if ack.topic == topic => return Ok(()),
                Ok(ServerMessage::Error(e)) => return Err(StoreError::Transport(e.message)),
                Ok(_) => debug!("Skipping pre-ack message on {}", topic),
                Err(e) => warn!("Unparseable message on {}: {}", topic, e),
            },
            Ok(Message::Close(_)) => return Err(StoreError::Closed),
            Ok(_) => {}
            Err(e) => return Err(StoreError::Transport(e.to_string())),
        }
    }
    Err(StoreError::Closed)
}

enum FeedSink {
    Changes(mpsc::Sender<RecordEvent>),
    Presence(mpsc::Sender<Vec<PresenceEntry>>),
}

/// Per-channel task: routes server messages into the feed, heartbeats on an
/// interval, and leaves cleanly on shutdown. Dropping the feed sender is what
/// signals a transport drop to the subscriber.
async fn run_channel(
    topic: String,
    mut write: WsWriter,
    mut read: WsReader,
    mut shutdown: oneshot::Receiver<()>,
    sink: FeedSink,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(txt))) => {
                        let parsed: ServerMessage = match serde_json::from_str(txt.as_str()) {
                            Ok(parsed) => parsed,
                            Err(e) => {
                                warn!("Unparseable message on {}: {}", topic, e);
                                continue;
                            }
                        };
                        match (parsed, &sink) {
                            (ServerMessage::Change(change), FeedSink::Changes(tx)) => {
                                if change.topic != topic {
                                    debug!("Ignoring change for foreign topic {}", change.topic);
                                    continue;
                                }
                                if let Some(event) = change.into_event() {
                                    if tx.send(event).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            (ServerMessage::Presence(presence), FeedSink::Presence(tx)) => {
                                if presence.topic != topic {
                                    continue;
                                }
                                if tx.send(presence.entries).await.is_err() {
                                    break;
                                }
                            }
                            (ServerMessage::Error(e), _) => {
                                warn!("Channel {} reported: {}", topic, e.message);
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Channel {} closed by server", topic);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Channel {} transport error: {}", topic, e);
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                let leave = ClientMessage::Leave(LeaveMessage { topic: topic.clone() });
                if let Ok(json) = serde_json::to_string(&leave) {
                    let _ = write.send(Message::Text(json.into())).await;
                }
                let _ = write.close().await;
                debug!("Left realtime channel {}", topic);
                break;
            }
            _ = heartbeat.tick() => {
                if let Ok(json) = serde_json::to_string(&ClientMessage::Heartbeat) {
                    if write.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
