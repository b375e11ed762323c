//! Supabase Realtime (Phoenix channel protocol) insert feed.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::{InsertFeed, Subscription};
use crate::config::ServiceConfig;
use crate::models::PendingRecord;
use crate::{Error, Result};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_SCHEMA: &str = "public";

#[derive(Clone)]
pub struct SupabaseRealtimeFeed {
    endpoint: String,
    access_token: Option<String>,
    schema: String,
}

impl SupabaseRealtimeFeed {
    /// `endpoint` is the full websocket URL including `apikey` and `vsn`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_token: None,
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.realtime_url())
    }

    /// Join with a user JWT so row-level security applies to delivered rows.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }
}

#[async_trait]
impl InsertFeed for SupabaseRealtimeFeed {
    async fn subscribe_inserts(&self, table: &str) -> Result<Subscription> {
        let (socket, _) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|error| Error::Realtime(format!("connect failed: {error}")))?;
        let (mut sink, stream) = socket.split();

        let topic = format!("realtime:{table}-inserts");
        let join = join_message(&topic, &self.schema, table, self.access_token.as_deref());
        sink.send(Message::Text(join.to_string()))
            .await
            .map_err(|error| Error::Realtime(format!("join failed: {error}")))?;
        tracing::info!("Joined realtime channel {} for {}.{}", topic, self.schema, table);

        let (sender, receiver) = mpsc::unbounded_channel();
        let (stop_sender, stop_receiver) = oneshot::channel();
        tokio::spawn(run_channel(sink, stream, topic, sender, stop_receiver));

        Ok(Subscription::new(table, receiver, move || {
            let _ = stop_sender.send(());
        }))
    }
}

async fn run_channel<Si, St>(
    mut sink: Si,
    mut stream: St,
    topic: String,
    sender: mpsc::UnboundedSender<PendingRecord>,
    mut stop: oneshot::Receiver<()>,
) where
    Si: futures::Sink<Message> + Unpin + Send,
    Si::Error: std::fmt::Display,
    St: futures::Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin
        + Send,
{
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    // ref "1" was the join
    let mut next_ref: u64 = 2;

    loop {
        tokio::select! {
            _ = &mut stop => {
                let leave = json!({ "topic": topic, "event": "phx_leave", "payload": {}, "ref": next_ref.to_string() });
                let _ = sink.send(Message::Text(leave.to_string())).await;
                let _ = sink.close().await;
                tracing::info!("Left realtime channel {}", topic);
                break;
            }
            _ = heartbeat.tick() => {
                let beat = json!({ "topic": "phoenix", "event": "heartbeat", "payload": {}, "ref": next_ref.to_string() });
                next_ref += 1;
                if let Err(error) = sink.send(Message::Text(beat.to_string())).await {
                    tracing::warn!("Realtime heartbeat failed on {}: {}", topic, error);
                    break;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match parse_frame(&text, &topic) {
                    FrameEvent::Insert(record) => {
                        if sender.send(*record).is_err() {
                            break;
                        }
                    }
                    FrameEvent::ChannelError(reason) => {
                        tracing::warn!("Realtime channel {} rejected: {}", topic, reason);
                        break;
                    }
                    FrameEvent::Ignored => {}
                },
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Realtime socket closed for {}", topic);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::warn!("Realtime socket error on {}: {}", topic, error);
                    break;
                }
            }
        }
    }
}

fn join_message(topic: &str, schema: &str, table: &str, access_token: Option<&str>) -> Value {
    let mut payload = json!({
        "config": {
            "broadcast": { "ack": false, "self": false },
            "presence": { "key": "" },
            "postgres_changes": [
                { "event": "INSERT", "schema": schema, "table": table }
            ]
        }
    });
    if let Some(token) = access_token {
        payload["access_token"] = Value::String(token.to_string());
    }
    json!({ "topic": topic, "event": "phx_join", "payload": payload, "ref": "1" })
}

#[derive(Debug)]
enum FrameEvent {
    Insert(Box<PendingRecord>),
    ChannelError(String),
    Ignored,
}

#[derive(Debug, Deserialize)]
struct PhoenixFrame {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct ChangeEnvelope {
    data: ChangeData,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: String,
    record: Option<Value>,
}

fn parse_frame(text: &str, topic: &str) -> FrameEvent {
    let Ok(frame) = serde_json::from_str::<PhoenixFrame>(text) else {
        tracing::debug!("Ignoring non-Phoenix realtime frame");
        return FrameEvent::Ignored;
    };
    if frame.topic != topic {
        return FrameEvent::Ignored;
    }

    match frame.event.as_str() {
        "postgres_changes" => {
            let Ok(envelope) = serde_json::from_value::<ChangeEnvelope>(frame.payload) else {
                return FrameEvent::Ignored;
            };
            if envelope.data.kind != "INSERT" {
                return FrameEvent::Ignored;
            }
            envelope
                .data
                .record
                .map_or(FrameEvent::Ignored, decode_record)
        }
        "phx_reply" | "system" => {
            let status = frame.payload.get("status").and_then(Value::as_str);
            if status == Some("error") {
                let reason = frame
                    .payload
                    .get("response")
                    .or_else(|| frame.payload.get("message"))
                    .map_or_else(|| "unknown error".to_string(), Value::to_string);
                FrameEvent::ChannelError(reason)
            } else {
                FrameEvent::Ignored
            }
        }
        "phx_error" => FrameEvent::ChannelError("channel crashed".to_string()),
        "phx_close" => FrameEvent::ChannelError("channel closed by server".to_string()),
        _ => FrameEvent::Ignored,
    }
}

fn decode_record(record: Value) -> FrameEvent {
    match serde_json::from_value::<PendingRecord>(record) {
        Ok(record) => FrameEvent::Insert(Box::new(record)),
        Err(error) => {
            tracing::warn!("Dropping malformed realtime insert: {}", error);
            FrameEvent::Ignored
        }
    }
}
