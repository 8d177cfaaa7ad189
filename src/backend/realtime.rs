//! Supabase Realtime over Phoenix channels.
//!
//! One socket per subscription: join a channel configured for `postgres_changes`
//! INSERT events on a table, keep it alive with heartbeats, and forward every
//! inserted row plus connection-state transitions through an `mpsc` channel.
//!
//! There is no reconnect loop. When the socket closes or the join is refused
//! the task reports `ConnectionStatus::Error` and exits; the owner decides when
//! to subscribe again.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use utoipa::ToSchema;

use crate::backend::RawReading;
use crate::error::{AppError, AppResult};

const EVENT_BUFFER: usize = 256;
const JOIN_REF: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    Status(ConnectionStatus),
    Insert(RawReading),
}

/// Receiving end of a realtime subscription. Dropping it closes the socket.
pub struct Subscription {
    events: mpsc::Receiver<RealtimeEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    #[must_use]
    pub fn new(events: mpsc::Receiver<RealtimeEvent>, task: JoinHandle<()>) -> Self {
        Self {
            events,
            task: Some(task),
        }
    }

    /// Subscription fed by something other than a socket task.
    #[must_use]
    pub fn from_receiver(events: mpsc::Receiver<RealtimeEvent>) -> Self {
        Self { events, task: None }
    }

    pub async fn recv(&mut self) -> Option<RealtimeEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Phoenix wire frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

/// What an inbound frame means for the subscription
#[derive(Debug, Clone)]
pub enum ChannelSignal {
    Joined,
    Insert(RawReading),
    Failed(String),
    Ignore,
}

#[derive(Debug, Clone)]
pub struct RealtimeClient {
    socket_url: String,
    access_token: Option<String>,
    heartbeat: Duration,
}

impl RealtimeClient {
    #[must_use]
    pub fn new(
        base_url: &str,
        api_key: &str,
        access_token: Option<String>,
        heartbeat: Duration,
    ) -> Self {
        Self {
            socket_url: socket_url(base_url, api_key),
            access_token,
            heartbeat: heartbeat.max(Duration::from_secs(1)),
        }
    }

    /// Start listening for INSERTs on `table`. Returns immediately; the socket
    /// is opened by the spawned task.
    #[must_use]
    pub fn subscribe_inserts(&self, table: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let task = tokio::spawn(run_channel(self.clone(), table.to_string(), tx));
        Subscription::new(rx, task)
    }

    async fn channel_loop(&self, table: &str, tx: &mpsc::Sender<RealtimeEvent>) -> AppResult<()> {
        let (socket, _) = connect_async(self.socket_url.as_str())
            .await
            .map_err(|e| AppError::Transport(format!("Realtime connect failed: {e}")))?;
        let (mut write, mut read) = socket.split();

        let topic = channel_topic(table);
        let join = join_message(&topic, table, self.access_token.as_deref());
        write
            .send(encode(&join)?)
            .await
            .map_err(|e| AppError::Transport(format!("Realtime join failed: {e}")))?;

        tracing::debug!(topic = %topic, "Joined realtime channel, awaiting reply");

        let mut ticker = interval(self.heartbeat);
        // First tick completes immediately
        ticker.tick().await;
        let mut next_ref: u64 = 2;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let heartbeat = PhoenixMessage {
                        topic: "phoenix".to_string(),
                        event: "heartbeat".to_string(),
                        payload: json!({}),
                        msg_ref: Some(next_ref.to_string()),
                        join_ref: None,
                    };
                    next_ref += 1;
                    write
                        .send(encode(&heartbeat)?)
                        .await
                        .map_err(|e| AppError::Transport(format!("Realtime heartbeat failed: {e}")))?;
                }
                item = read.next() => {
                    let Some(item) = item else {
                        return Ok(());
                    };
                    let message = item
                        .map_err(|e| AppError::Transport(format!("Realtime read failed: {e}")))?;

                    match message {
                        Message::Text(text) => {
                            let frame: PhoenixMessage = match serde_json::from_str(text.as_str()) {
                                Ok(frame) => frame,
                                Err(e) => {
                                    tracing::debug!(error = %e, "Ignoring unparsable realtime frame");
                                    continue;
                                }
                            };

                            match classify(&topic, &frame) {
                                ChannelSignal::Joined => {
                                    tracing::info!(topic = %topic, "Realtime channel subscribed");
                                    if tx.send(RealtimeEvent::Status(ConnectionStatus::Connected)).await.is_err() {
                                        return Ok(());
                                    }
                                }
                                ChannelSignal::Insert(raw) => {
                                    if tx.send(RealtimeEvent::Insert(raw)).await.is_err() {
                                        return Ok(());
                                    }
                                }
                                ChannelSignal::Failed(reason) => {
                                    return Err(AppError::Transport(reason));
                                }
                                ChannelSignal::Ignore => {}
                            }
                        }
                        Message::Close(_) => return Ok(()),
                        _ => {}
                    }
                }
            }
        }
    }
}

async fn run_channel(client: RealtimeClient, table: String, tx: mpsc::Sender<RealtimeEvent>) {
    let _ = tx
        .send(RealtimeEvent::Status(ConnectionStatus::Connecting))
        .await;

    match client.channel_loop(&table, &tx).await {
        Ok(()) => tracing::warn!(table = %table, "Realtime channel closed"),
        Err(e) => tracing::error!(error = %e, table = %table, "Realtime channel failed"),
    }

    let _ = tx.send(RealtimeEvent::Status(ConnectionStatus::Error)).await;
}

/// `https://x.supabase.co` → `wss://x.supabase.co/realtime/v1/websocket?apikey=…&vsn=1.0.0`
#[must_use]
pub fn socket_url(base_url: &str, api_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws_base}/realtime/v1/websocket?apikey={api_key}&vsn=1.0.0")
}

#[must_use]
pub fn channel_topic(table: &str) -> String {
    format!("realtime:{table}_updates")
}

#[must_use]
pub fn join_message(topic: &str, table: &str, access_token: Option<&str>) -> PhoenixMessage {
    let mut payload = json!({
        "config": {
            "broadcast": { "self": false },
            "presence": { "key": "" },
            "postgres_changes": [
                { "event": "INSERT", "schema": "public", "table": table }
            ],
        },
    });
    if let Some(token) = access_token {
        payload["access_token"] = Value::String(token.to_string());
    }

    PhoenixMessage {
        topic: topic.to_string(),
        event: "phx_join".to_string(),
        payload,
        msg_ref: Some(JOIN_REF.to_string()),
        join_ref: Some(JOIN_REF.to_string()),
    }
}

/// Interpret one inbound frame for the channel on `topic`.
#[must_use]
pub fn classify(topic: &str, frame: &PhoenixMessage) -> ChannelSignal {
    if frame.topic != topic {
        // Heartbeat replies arrive on "phoenix"
        return ChannelSignal::Ignore;
    }

    let status = frame.payload.get("status").and_then(Value::as_str);

    match frame.event.as_str() {
        "phx_reply" if frame.msg_ref.as_deref() == Some(JOIN_REF) => match status {
            Some("ok") => ChannelSignal::Joined,
            _ => ChannelSignal::Failed(format!(
                "Realtime join refused: {}",
                frame.payload.get("response").unwrap_or(&Value::Null)
            )),
        },
        "postgres_changes" => {
            let data = frame.payload.get("data").unwrap_or(&Value::Null);
            let is_insert = data.get("type").and_then(Value::as_str) == Some("INSERT");
            match data.get("record") {
                Some(record) if is_insert => ChannelSignal::Insert(decode_record(record)),
                _ => ChannelSignal::Ignore,
            }
        }
        // Legacy realtime protocol sends the change type as the event name
        "INSERT" => frame
            .payload
            .get("record")
            .map_or(ChannelSignal::Ignore, |record| {
                ChannelSignal::Insert(decode_record(record))
            }),
        "system" if status == Some("error") => ChannelSignal::Failed(format!(
            "Realtime system error: {}",
            frame
                .payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
        )),
        "phx_error" => ChannelSignal::Failed("Realtime channel errored".to_string()),
        "phx_close" => ChannelSignal::Failed("Realtime channel closed by server".to_string()),
        _ => ChannelSignal::Ignore,
    }
}

fn decode_record(record: &Value) -> RawReading {
    serde_json::from_value(record.clone()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Malformed realtime record, normalizing as empty");
        RawReading::default()
    })
}

fn encode(message: &PhoenixMessage) -> AppResult<Message> {
    serde_json::to_string(message)
        .map(|text| Message::Text(text.into()))
        .map_err(|e| AppError::Internal(format!("Failed to encode realtime frame: {e}")))
}
