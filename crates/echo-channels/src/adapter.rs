use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use echo_core::{Event, Response};

/// An incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Channel-specific message ID.
    pub id: String,
    /// Channel instance identifier (e.g. "discord").
    pub channel: String,
    /// Where a reply should go (channel/chat ID on the platform).
    pub target: String,
    /// Whether this arrived as a direct message.
    pub is_dm: bool,
    /// The message itself.
    pub event: Event,
}

/// An outgoing response to send via a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Target channel.
    pub channel: String,
    /// Target chat/user/group ID.
    pub target: String,
    /// What to send.
    pub response: Response,
}

/// Events emitted by a channel adapter.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The platform told us who we are.
    Ready { bot_id: String },
    /// A new message arrived.
    Message(IncomingMessage),
    /// The channel connected successfully.
    Connected,
    /// The channel disconnected.
    Disconnected(Option<String>),
}

/// Trait implemented by each channel adapter.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Unique identifier for this channel instance.
    fn id(&self) -> &str;

    /// Channel type name (e.g., "discord", "console").
    fn channel_type(&self) -> &str;

    /// Start the channel adapter. Returns a receiver for incoming events.
    async fn start(&mut self) -> echo_core::Result<mpsc::Receiver<ChannelEvent>>;

    /// Send a message through this channel.
    async fn send(&self, message: OutgoingMessage) -> echo_core::Result<()>;

    /// Stop the channel adapter gracefully.
    async fn stop(&mut self) -> echo_core::Result<()>;

    /// Check if the channel is currently connected.
    fn is_connected(&self) -> bool;

    /// Most recent round-trip estimate to the platform, if one is known.
    fn latency(&self) -> Option<Duration> {
        None
    }
}
