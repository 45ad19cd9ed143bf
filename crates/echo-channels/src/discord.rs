use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use echo_core::{Author, Embed, Event, Response};

use crate::adapter::*;

/// Discord Gateway opcodes.
const OP_DISPATCH: u64 = 0;
const OP_HEARTBEAT: u64 = 1;
const OP_IDENTIFY: u64 = 2;
const OP_RECONNECT: u64 = 7;
const OP_INVALID_SESSION: u64 = 9;
const OP_HELLO: u64 = 10;
const OP_HEARTBEAT_ACK: u64 = 11;

const DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord channel adapter using Gateway WebSocket for receiving and REST API for sending.
///
/// ## Setup
///
/// 1. Go to <https://discord.com/developers/applications> → Create application
/// 2. Bot section → Copy token
/// 3. Enable "Message Content Intent" under Privileged Gateway Intents
/// 4. OAuth2 URL Generator → bot scope → Send Messages + Embed Links → invite to server
/// 5. Configure in echo.toml:
///    ```toml
///    [gateway]
///    token = "YOUR_BOT_TOKEN"
///    ```
pub struct DiscordChannel {
    id: String,
    token: String,
    intents: u64,
    client: reqwest::Client,
    connected: Arc<AtomicBool>,
    /// Last heartbeat round-trip in microseconds; 0 until the first ACK.
    latency_micros: Arc<AtomicU64>,
    shutdown_tx: Option<tokio::sync::watch::Sender<bool>>,
}

impl DiscordChannel {
    pub fn new(id: String, token: String, intents: u64) -> Self {
        Self {
            id,
            token,
            intents,
            client: reqwest::Client::new(),
            connected: Arc::new(AtomicBool::new(false)),
            latency_micros: Arc::new(AtomicU64::new(0)),
            shutdown_tx: None,
        }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn id(&self) -> &str {
        &self.id
    }
    fn channel_type(&self) -> &str {
        "discord"
    }

    async fn start(&mut self) -> echo_core::Result<mpsc::Receiver<ChannelEvent>> {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let session = GatewaySession {
            token: self.token.clone(),
            intents: self.intents,
            channel_id: self.id.clone(),
            connected: self.connected.clone(),
            latency_micros: self.latency_micros.clone(),
        };

        tokio::spawn(async move {
            discord_gateway_loop(session, event_tx, shutdown_rx).await;
        });

        Ok(event_rx)
    }

    async fn send(&self, message: OutgoingMessage) -> echo_core::Result<()> {
        let url = format!("{}/channels/{}/messages", DISCORD_API_BASE, message.target);

        let body = message_body(&message.response);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| echo_core::EchoError::Channel {
                channel: "discord".into(),
                reason: format!("HTTP error: {e}"),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "Discord API error sending message");
            return Err(echo_core::EchoError::Channel {
                channel: "discord".into(),
                reason: format!("Discord API {status}: {text}"),
            });
        }

        Ok(())
    }

    async fn stop(&mut self) -> echo_core::Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        self.connected.store(false, Ordering::SeqCst);
        info!("Discord channel stopped");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn latency(&self) -> Option<Duration> {
        match self.latency_micros.load(Ordering::Relaxed) {
            0 => None,
            us => Some(Duration::from_micros(us)),
        }
    }
}

/// Shared state handed to the background gateway task.
struct GatewaySession {
    token: String,
    intents: u64,
    channel_id: String,
    connected: Arc<AtomicBool>,
    latency_micros: Arc<AtomicU64>,
}

/// Build the REST body for a response: plain `content` or a single embed.
pub fn message_body(response: &Response) -> Value {
    match response {
        Response::Text { text } => json!({ "content": text }),
        Response::Embed { embed } => json!({ "embeds": [embed_json(embed)] }),
    }
}

fn embed_json(embed: &Embed) -> Value {
    let mut value = json!({
        "title": embed.title,
        "color": embed.color.rgb(),
        "fields": embed
            .fields
            .iter()
            .map(|f| json!({ "name": f.name, "value": f.value, "inline": f.inline }))
            .collect::<Vec<_>>(),
    });
    if let Some(ref description) = embed.description {
        value["description"] = json!(description);
    }
    if let Some(ref footer) = embed.footer {
        value["footer"] = json!({ "text": footer });
    }
    value
}

/// Stable display string for a Discord user: `name`, or `name#1234` for
/// accounts that still carry a legacy discriminator.
pub fn author_display(author: &Value) -> String {
    let username = author["username"].as_str().unwrap_or("unknown");
    match author["discriminator"].as_str() {
        Some(d) if !d.is_empty() && d != "0" => format!("{username}#{d}"),
        _ => username.to_string(),
    }
}

/// Turn a MESSAGE_CREATE payload into an [`IncomingMessage`].
pub fn parse_message_create(data: &Value, channel_id: &str) -> Option<IncomingMessage> {
    let author_id = data["author"]["id"].as_str()?;
    let target = data["channel_id"].as_str()?;
    let content = data["content"].as_str().unwrap_or("");

    Some(IncomingMessage {
        id: data["id"].as_str().unwrap_or("").to_string(),
        channel: channel_id.to_string(),
        target: target.to_string(),
        is_dm: data["guild_id"].is_null(),
        event: Event::new(
            Author::new(author_id, author_display(&data["author"])),
            content,
        ),
    })
}

/// Main gateway loop: connects to Discord WebSocket, handles heartbeats, dispatches events.
async fn discord_gateway_loop(
    session: GatewaySession,
    event_tx: mpsc::Sender<ChannelEvent>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    let mut backoff = 1u64;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        info!("Discord: connecting to Gateway...");

        let ws_stream = match tokio_tungstenite::connect_async(DISCORD_GATEWAY_URL).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                error!(error = %e, "Discord Gateway connection failed");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(60);
                continue;
            }
        };

        backoff = 1;
        let (mut write, mut read) = ws_stream.split();

        // Wait for HELLO to get heartbeat interval
        let heartbeat_interval = match read.next().await {
            Some(Ok(msg)) => {
                let text = msg.to_text().unwrap_or("{}");
                let payload: Value = serde_json::from_str(text).unwrap_or_default();
                if payload["op"].as_u64() == Some(OP_HELLO) {
                    payload["d"]["heartbeat_interval"].as_u64().unwrap_or(41250)
                } else {
                    warn!("Discord: expected HELLO, got op={}", payload["op"]);
                    41250
                }
            }
            _ => {
                error!("Discord: no HELLO received");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(60);
                continue;
            }
        };

        let identify = json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": session.token,
                "intents": session.intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "echo",
                    "device": "echo"
                }
            }
        });

        if let Err(e) = write
            .send(tokio_tungstenite::tungstenite::Message::Text(
                identify.to_string().into(),
            ))
            .await
        {
            error!(error = %e, "Discord: failed to send IDENTIFY");
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = (backoff * 2).min(60);
            continue;
        }

        session.connected.store(true, Ordering::SeqCst);
        let _ = event_tx.send(ChannelEvent::Connected).await;
        info!(heartbeat_ms = heartbeat_interval, "Discord Gateway connected");

        let mut sequence: Option<u64> = None;
        let mut heartbeat_sent_at: Option<Instant> = None;
        let mut heartbeat_timer = tokio::time::interval(Duration::from_millis(heartbeat_interval));
        heartbeat_timer.tick().await; // consume initial tick

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Discord: shutdown signal received");
                        let _ = write.close().await;
                        return;
                    }
                }
                _ = heartbeat_timer.tick() => {
                    let hb = json!({ "op": OP_HEARTBEAT, "d": sequence });
                    if let Err(e) = write.send(
                        tokio_tungstenite::tungstenite::Message::Text(hb.to_string().into())
                    ).await {
                        warn!(error = %e, "Discord: heartbeat send failed");
                        break;
                    }
                    heartbeat_sent_at = Some(Instant::now());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(ws_msg)) => {
                            if ws_msg.is_close() {
                                info!("Discord: server closed connection");
                                break;
                            }
                            let text = match ws_msg.to_text() {
                                Ok(t) => t,
                                Err(_) => continue,
                            };
                            let payload: Value = match serde_json::from_str(text) {
                                Ok(v) => v,
                                Err(_) => continue,
                            };

                            let op = payload["op"].as_u64().unwrap_or(999);

                            if let Some(s) = payload["s"].as_u64() {
                                sequence = Some(s);
                            }

                            match op {
                                OP_DISPATCH => {
                                    let event_name = payload["t"].as_str().unwrap_or("");
                                    handle_discord_dispatch(
                                        event_name, &payload["d"], &session.channel_id, &event_tx,
                                    ).await;
                                }
                                OP_HEARTBEAT_ACK => {
                                    if let Some(sent) = heartbeat_sent_at.take() {
                                        let rtt = sent.elapsed().as_micros().max(1) as u64;
                                        session.latency_micros.store(rtt, Ordering::Relaxed);
                                        debug!(rtt_us = rtt, "Discord: heartbeat ACK");
                                    }
                                }
                                OP_HEARTBEAT => {
                                    let hb = json!({ "op": OP_HEARTBEAT, "d": sequence });
                                    let _ = write.send(
                                        tokio_tungstenite::tungstenite::Message::Text(hb.to_string().into())
                                    ).await;
                                    heartbeat_sent_at = Some(Instant::now());
                                }
                                OP_RECONNECT | OP_INVALID_SESSION => {
                                    info!(op = op, "Discord: gateway asked us to reconnect");
                                    break;
                                }
                                _ => {
                                    debug!(op = op, "Discord: unhandled opcode");
                                }
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Discord WebSocket error");
                            break;
                        }
                        None => {
                            info!("Discord: WebSocket stream ended");
                            break;
                        }
                    }
                }
            }
        }

        session.connected.store(false, Ordering::SeqCst);
        let _ = event_tx
            .send(ChannelEvent::Disconnected(Some(
                "Gateway connection lost".into(),
            )))
            .await;

        if *shutdown_rx.borrow() {
            break;
        }

        info!(retry_in = backoff, "Discord: reconnecting...");
        tokio::time::sleep(Duration::from_secs(backoff)).await;
        backoff = (backoff * 2).min(60);
    }
}

/// Handle a Discord DISPATCH event (op=0).
async fn handle_discord_dispatch(
    event_name: &str,
    data: &Value,
    channel_id: &str,
    event_tx: &mpsc::Sender<ChannelEvent>,
) {
    match event_name {
        "READY" => {
            if let Some(user_id) = data["user"]["id"].as_str() {
                info!(bot_id = %user_id, "Discord bot ready");
                let _ = event_tx
                    .send(ChannelEvent::Ready {
                        bot_id: user_id.to_string(),
                    })
                    .await;
            }
        }
        "MESSAGE_CREATE" => {
            let Some(incoming) = parse_message_create(data, channel_id) else {
                debug!("Discord: MESSAGE_CREATE without author or channel");
                return;
            };

            debug!(
                sender = %incoming.event.author.display,
                channel = %incoming.target,
                dm = incoming.is_dm,
                "Discord message received"
            );

            if event_tx
                .send(ChannelEvent::Message(incoming))
                .await
                .is_err()
            {
                warn!("Discord: event channel closed");
            }
        }
        _ => {
            debug!(event = %event_name, "Discord: unhandled dispatch event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echo_core::EmbedColor;

    #[test]
    fn test_text_body() {
        let body = message_body(&Response::text("Pong!"));
        assert_eq!(body["content"], "Pong!");
        assert!(body.get("embeds").is_none());
    }

    #[test]
    fn test_embed_body() {
        let embed = Embed::new("Chronicle Recall", EmbedColor::Purple)
            .description("Displaying the last 1 entries.")
            .field("Logged by `bob`", "```hi```")
            .footer("f");
        let body = message_body(&Response::embed(embed));
        let e = &body["embeds"][0];
        assert_eq!(e["title"], "Chronicle Recall");
        assert_eq!(e["color"], 0x9b59b6);
        assert_eq!(e["fields"][0]["value"], "```hi```");
        assert_eq!(e["fields"][0]["inline"], false);
        assert_eq!(e["footer"]["text"], "f");
    }

    #[test]
    fn test_author_display() {
        assert_eq!(author_display(&json!({"username": "bob", "discriminator": "0"})), "bob");
        assert_eq!(author_display(&json!({"username": "bob", "discriminator": "4242"})), "bob#4242");
        assert_eq!(author_display(&json!({"username": "bob"})), "bob");
    }

    #[test]
    fn test_parse_message_create() {
        let data = json!({
            "id": "m1",
            "channel_id": "c9",
            "guild_id": "g1",
            "content": "!log Server restarted",
            "author": {"id": "u1", "username": "bob", "discriminator": "0"}
        });
        let msg = parse_message_create(&data, "discord").unwrap();
        assert_eq!(msg.target, "c9");
        assert!(!msg.is_dm);
        assert_eq!(msg.event.author.id, "u1");
        assert_eq!(msg.event.author.display, "bob");
        assert_eq!(msg.event.text, "!log Server restarted");
    }

    #[test]
    fn test_parse_dm_and_missing_author() {
        let dm = json!({"id": "m", "channel_id": "c", "content": "hi", "author": {"id": "u", "username": "x"}});
        assert!(parse_message_create(&dm, "discord").unwrap().is_dm);
        let broken = json!({"id": "m", "channel_id": "c", "content": "hi"});
        assert!(parse_message_create(&broken, "discord").is_none());
    }

    #[test]
    fn test_latency_unknown_until_ack() {
        let ch = DiscordChannel::new("discord".into(), "t".into(), 0);
        assert!(ch.latency().is_none());
        ch.latency_micros.store(12_500, Ordering::Relaxed);
        assert_eq!(ch.latency(), Some(Duration::from_micros(12_500)));
    }
}
