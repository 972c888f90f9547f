use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use super::handler::CommandHandler;
use super::interaction::Interaction;
use super::rest::DiscordHttp;

/// Slash commands only need the GUILDS intent.
const GATEWAY_INTENTS: u64 = 1 << 0;
const MAX_BACKOFF_SECS: u64 = 30;

/// A gateway session: receives interactions and hands them to the command handler.
pub struct Gateway {
    token: String,
    guild_id: Option<u64>,
    http: Arc<DiscordHttp>,
    handler: Arc<dyn CommandHandler>,
}

enum SessionEnd {
    Cancelled,
    Dropped,
}

impl Gateway {
    pub fn new(
        token: impl Into<String>,
        guild_id: Option<u64>,
        http: Arc<DiscordHttp>,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        Self {
            token: token.into(),
            guild_id,
            http,
            handler,
        }
    }

    /// Connects and keeps reconnecting until `cancel` fires, then waits for
    /// commands still in flight.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let tasks = TaskTracker::new();
        let mut registered = false;
        let mut backoff_secs = 1_u64;

        while !cancel.is_cancelled() {
            let gateway_url = match self.http.gateway_url().await {
                Ok(url) => url,
                Err(error) => {
                    error!(error = %error, "discord gateway URL lookup failed");
                    backoff(&cancel, &mut backoff_secs).await;
                    continue;
                }
            };

            let ws = match tokio_tungstenite::connect_async(&gateway_url).await {
                Ok((stream, _response)) => stream,
                Err(error) => {
                    error!(error = %error, "discord websocket connect failed");
                    backoff(&cancel, &mut backoff_secs).await;
                    continue;
                }
            };

            backoff_secs = 1;
            info!("Connected to Discord gateway");

            match self.session(ws, &cancel, &tasks, &mut registered).await {
                SessionEnd::Cancelled => break,
                SessionEnd::Dropped => {
                    warn!("Discord gateway session ended, reconnecting");
                    backoff(&cancel, &mut backoff_secs).await;
                }
            }
        }

        tasks.close();
        if !tasks.is_empty() {
            info!(running = tasks.len(), "Waiting for running commands to finish");
        }
        tasks.wait().await;
        info!("Discord gateway stopped");
        Ok(())
    }

    async fn session<S>(
        &self,
        ws: WebSocketStream<S>,
        cancel: &CancellationToken,
        tasks: &TaskTracker,
        registered: &mut bool,
    ) -> SessionEnd
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut writer, mut reader) = ws.split();

        let hello_interval = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = writer.send(WsMessage::Close(None)).await;
                    return SessionEnd::Cancelled;
                }
                next = reader.next() => {
                    let text = match next {
                        Some(Ok(WsMessage::Text(text))) => text,
                        Some(Ok(_)) => continue,
                        Some(Err(error)) => {
                            warn!(error = %error, "discord read error while waiting for hello");
                            break None;
                        }
                        None => break None,
                    };
                    match serde_json::from_str::<GatewayPayload>(&text) {
                        Ok(payload) if payload.op == 10 => break Some(payload.heartbeat_interval()),
                        Ok(_) => continue,
                        Err(error) => {
                            warn!(error = %error, "discord hello payload decode failed");
                            continue;
                        }
                    }
                }
            }
        };

        let Some(heartbeat_interval_ms) = hello_interval else {
            return SessionEnd::Dropped;
        };

        if writer
            .send(WsMessage::Text(self.identify_payload().to_string()))
            .await
            .is_err()
        {
            return SessionEnd::Dropped;
        }

        let mut heartbeat = tokio::time::interval(Duration::from_millis(heartbeat_interval_ms));
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let _ = heartbeat.tick().await;

        let mut last_sequence: Option<u64> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = writer.send(WsMessage::Close(None)).await;
                    return SessionEnd::Cancelled;
                }
                _ = heartbeat.tick() => {
                    let beat = serde_json::json!({"op": 1, "d": last_sequence});
                    if writer.send(WsMessage::Text(beat.to_string())).await.is_err() {
                        return SessionEnd::Dropped;
                    }
                }
                next = reader.next() => {
                    let message = match next {
                        Some(Ok(message)) => message,
                        Some(Err(error)) => {
                            warn!(error = %error, "discord websocket read failed");
                            return SessionEnd::Dropped;
                        }
                        None => return SessionEnd::Dropped,
                    };

                    let text = match message {
                        WsMessage::Text(text) => text,
                        WsMessage::Ping(payload) => {
                            if writer.send(WsMessage::Pong(payload)).await.is_err() {
                                return SessionEnd::Dropped;
                            }
                            continue;
                        }
                        WsMessage::Close(frame) => {
                            warn!(?frame, "discord gateway closed the connection");
                            return SessionEnd::Dropped;
                        }
                        _ => continue,
                    };

                    let payload: GatewayPayload = match serde_json::from_str(&text) {
                        Ok(payload) => payload,
                        Err(error) => {
                            warn!(error = %error, "discord payload decode failed");
                            continue;
                        }
                    };

                    if let Some(seq) = payload.s {
                        last_sequence = Some(seq);
                    }

                    match payload.op {
                        0 => self.dispatch(payload, tasks, registered).await,
                        1 => {
                            let beat = serde_json::json!({"op": 1, "d": last_sequence});
                            if writer.send(WsMessage::Text(beat.to_string())).await.is_err() {
                                return SessionEnd::Dropped;
                            }
                        }
                        7 | 9 => return SessionEnd::Dropped,
                        _ => {}
                    }
                }
            }
        }
    }

    async fn dispatch(&self, payload: GatewayPayload, tasks: &TaskTracker, registered: &mut bool) {
        let data = payload.d.unwrap_or_default();
        match payload.t.as_deref() {
            Some("READY") => {
                let ready: ReadyEvent = match serde_json::from_value(data) {
                    Ok(ready) => ready,
                    Err(error) => {
                        warn!(error = %error, "discord READY decode failed");
                        return;
                    }
                };
                info!(user = %ready.user.username, "Bot has connected to Discord");
                if *registered {
                    return;
                }
                match self
                    .http
                    .register_commands(&ready.application.id, self.guild_id, &self.handler.commands())
                    .await
                {
                    Ok(_) => *registered = true,
                    Err(error) => error!(error = %error, "Slash command registration failed"),
                }
            }
            Some("INTERACTION_CREATE") => {
                let interaction: Interaction = match serde_json::from_value(data) {
                    Ok(interaction) => interaction,
                    Err(error) => {
                        warn!(error = %error, "discord INTERACTION_CREATE decode failed");
                        return;
                    }
                };
                let handler = Arc::clone(&self.handler);
                tasks.spawn(async move { handler.handle(interaction).await });
            }
            _ => {}
        }
    }

    fn identify_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "op": 2,
            "d": {
                "token": self.token,
                "intents": GATEWAY_INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "deploy-bot",
                    "device": "deploy-bot"
                }
            }
        })
    }
}

/// Sleeps for the current backoff (or until cancelled) and doubles it.
async fn backoff(cancel: &CancellationToken, secs: &mut u64) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(Duration::from_secs(*secs)) => {}
    }
    *secs = (*secs * 2).min(MAX_BACKOFF_SECS);
}

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Option<serde_json::Value>,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

impl GatewayPayload {
    fn heartbeat_interval(&self) -> u64 {
        self.d
            .as_ref()
            .and_then(|value| value.get("heartbeat_interval"))
            .and_then(|value| value.as_u64())
            .unwrap_or(30_000)
    }
}

#[derive(Debug, Deserialize)]
struct ReadyEvent {
    user: ReadyUser,
    application: ReadyApplication,
}

#[derive(Debug, Deserialize)]
struct ReadyUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct ReadyApplication {
    id: String,
}
