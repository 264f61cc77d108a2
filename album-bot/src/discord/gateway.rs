//! Minimal Discord gateway client that only listens for reaction events.
//!
//! Each call to [`Gateway::run`] is one connection. It returns when the
//! connection drops or Discord asks for a reconnect; the caller restarts it.

use crate::shutdown::Shutdown;
use crate::types::{BotError, DiscordConfig, PostId, ReactionChange, ReactionEvent, Result, UserId};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

const INTENT_GUILDS: u64 = 1 << 0;
const INTENT_GUILD_MESSAGE_REACTIONS: u64 = 1 << 10;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Value,
    s: Option<u64>,
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadyData {
    user: GatewayUser,
}

#[derive(Debug, Deserialize)]
struct GatewayUser {
    id: String,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct GatewayMember {
    user: Option<GatewayUser>,
}

#[derive(Debug, Deserialize)]
struct ReactionData {
    user_id: String,
    channel_id: String,
    message_id: String,
    emoji: GatewayEmoji,
    member: Option<GatewayMember>,
}

#[derive(Debug, Deserialize)]
struct GatewayEmoji {
    id: Option<String>,
    name: Option<String>,
}

/// Per-connection state needed to turn dispatches into reaction events.
#[derive(Debug, Default)]
pub struct DispatchState {
    self_id: Option<String>,
    last_sequence: Option<u64>,
}

impl DispatchState {
    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    /// Handle one dispatch. Returns a reaction event when it concerns `channel_id`.
    pub fn dispatch(&mut self, event: &str, data: Value, channel_id: &str) -> Option<ReactionEvent> {
        let change = match event {
            "READY" => {
                match serde_json::from_value::<ReadyData>(data) {
                    Ok(ready) => {
                        info!("Gateway ready as user {}", ready.user.id);
                        self.self_id = Some(ready.user.id);
                    }
                    Err(e) => warn!("Malformed READY payload: {}", e),
                }
                return None;
            }
            "MESSAGE_REACTION_ADD" => ReactionChange::Added,
            "MESSAGE_REACTION_REMOVE" => ReactionChange::Removed,
            _ => return None,
        };

        let reaction: ReactionData = match serde_json::from_value(data) {
            Ok(reaction) => reaction,
            Err(e) => {
                debug!("Ignoring malformed reaction payload: {}", e);
                return None;
            }
        };
        if reaction.channel_id != channel_id {
            return None;
        }
        // Custom emoji are never rating symbols.
        if reaction.emoji.id.is_some() {
            return None;
        }
        let emoji = reaction.emoji.name?;

        let member_is_bot = reaction
            .member
            .and_then(|member| member.user)
            .map(|user| user.bot)
            .unwrap_or(false);
        let is_self = self.self_id.as_deref() == Some(reaction.user_id.as_str());

        Some(ReactionEvent {
            post_id: PostId(reaction.message_id),
            user_id: UserId(reaction.user_id),
            emoji,
            change,
            is_bot: member_is_bot || is_self,
        })
    }
}

pub struct Gateway {
    config: DiscordConfig,
}

impl Gateway {
    pub fn new(config: DiscordConfig) -> Self {
        Self { config }
    }

    fn identify(&self) -> Value {
        json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": self.config.token,
                "intents": INTENT_GUILDS | INTENT_GUILD_MESSAGE_REACTIONS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "album-bot",
                    "device": "album-bot",
                },
            },
        })
    }

    /// Run one gateway session, forwarding reactions to `events` in arrival order.
    ///
    /// Returns `Ok(())` only on shutdown.
    pub async fn run(&self, events: mpsc::Sender<ReactionEvent>, mut shutdown: Shutdown) -> Result<()> {
        let (socket, _) = tokio_tungstenite::connect_async(GATEWAY_URL)
            .await
            .map_err(|e| BotError::Gateway(format!("connect failed: {}", e)))?;
        let (mut sink, mut stream) = socket.split();
        info!("Connected to gateway");

        let mut state = DispatchState::default();
        // Replaced by the interval from HELLO.
        let mut heartbeat = tokio::time::interval(Duration::from_secs(3600));
        heartbeat.tick().await;
        let mut awaiting_ack = false;

        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    let _ = sink.send(Message::Close(None)).await;
                    info!("Gateway shutting down");
                    return Ok(());
                }
                _ = heartbeat.tick() => {
                    if awaiting_ack {
                        return Err(BotError::Gateway("heartbeat not acknowledged".to_string()));
                    }
                    let beat = json!({ "op": OP_HEARTBEAT, "d": state.last_sequence });
                    sink.send(Message::Text(beat.to_string()))
                        .await
                        .map_err(|e| BotError::Gateway(format!("heartbeat failed: {}", e)))?;
                    awaiting_ack = true;
                }
                message = stream.next() => {
                    let text = match message {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => {
                            return Err(BotError::Gateway(format!("closed by server: {:?}", frame)));
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(BotError::Gateway(e.to_string())),
                        None => return Err(BotError::Gateway("connection ended".to_string())),
                    };

                    let payload: GatewayPayload = match serde_json::from_str(&text) {
                        Ok(payload) => payload,
                        Err(e) => {
                            debug!("Ignoring undecodable gateway message: {}", e);
                            continue;
                        }
                    };
                    if let Some(sequence) = payload.s {
                        state.last_sequence = Some(sequence);
                    }

                    match payload.op {
                        OP_HELLO => {
                            let interval_ms = payload.d
                                .get("heartbeat_interval")
                                .and_then(Value::as_u64)
                                .ok_or_else(|| BotError::Gateway("HELLO without heartbeat interval".to_string()))?;
                            debug!("Heartbeat interval {}ms", interval_ms);
                            heartbeat = tokio::time::interval(Duration::from_millis(interval_ms));
                            heartbeat.tick().await;
                            sink.send(Message::Text(self.identify().to_string()))
                                .await
                                .map_err(|e| BotError::Gateway(format!("identify failed: {}", e)))?;
                        }
                        OP_HEARTBEAT_ACK => awaiting_ack = false,
                        OP_HEARTBEAT => {
                            let beat = json!({ "op": OP_HEARTBEAT, "d": state.last_sequence });
                            sink.send(Message::Text(beat.to_string()))
                                .await
                                .map_err(|e| BotError::Gateway(format!("heartbeat failed: {}", e)))?;
                        }
                        OP_RECONNECT => {
                            return Err(BotError::Gateway("server requested reconnect".to_string()));
                        }
                        OP_INVALID_SESSION => {
                            return Err(BotError::Gateway("session invalidated".to_string()));
                        }
                        OP_DISPATCH => {
                            let Some(event) = payload.t.as_deref() else { continue };
                            if let Some(reaction) = state.dispatch(event, payload.d, &self.config.channel_id) {
                                if events.send(reaction).await.is_err() {
                                    // Nobody is listening any more.
                                    return Ok(());
                                }
                            }
                        }
                        other => debug!("Ignoring gateway opcode {}", other),
                    }
                }
            }
        }
    }
}
