use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, mpsc};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use echo_channels::adapter::{Channel, ChannelEvent, IncomingMessage, OutgoingMessage};
use echo_core::{EchoError, Response, Result};

use crate::dispatcher::Dispatcher;

type SharedChannels = Arc<RwLock<Vec<Box<dyn Channel>>>>;

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Sent when a handler panics, so the user still gets an answer.
pub const HANDLER_CRASHED: &str = "❌ Error: Something went wrong while handling that command.";
/// Sent when the platform refuses a response, e.g. an embed over its size limits.
pub const DELIVERY_FAILED: &str = "❌ Error: The response could not be delivered.";

/// The event loop. Starts every registered channel, fans their events into
/// one queue, and runs each message through the [`Dispatcher`] on its own
/// task so a slow scrape never holds up a `!ping`.
pub struct EchoRuntime {
    dispatcher: Arc<Dispatcher>,
    channels: Vec<Box<dyn Channel>>,
    drain_timeout: Duration,
}

impl EchoRuntime {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            channels: Vec::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn add_channel(&mut self, channel: Box<dyn Channel>) {
        self.channels.push(channel);
    }

    /// How long shutdown waits for in-flight handlers before giving up.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Run until Ctrl-C or until every channel has closed.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("received ctrl-c");
        })
        .await
    }

    /// Run until `shutdown` resolves or until every channel has closed.
    ///
    /// On the way out no new events are accepted, in-flight handlers get
    /// `drain_timeout` to finish and send their responses, and then the
    /// channels are stopped.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        if self.channels.is_empty() {
            return Err(EchoError::Runtime("no channels configured".into()));
        }

        let (aggregate_tx, mut aggregate_rx) = mpsc::channel::<(String, ChannelEvent)>(512);

        let mut started = 0usize;
        for channel in &mut self.channels {
            let channel_id = channel.id().to_string();
            match channel.start().await {
                Ok(mut event_rx) => {
                    let tx = aggregate_tx.clone();
                    let id = channel_id.clone();
                    tokio::spawn(async move {
                        while let Some(event) = event_rx.recv().await {
                            if tx.send((id.clone(), event)).await.is_err() {
                                break;
                            }
                        }
                    });
                    info!(channel = %channel_id, kind = channel.channel_type(), "channel started");
                    started += 1;
                }
                Err(e) => {
                    error!(channel = %channel_id, error = %e, "failed to start channel");
                }
            }
        }
        drop(aggregate_tx);

        if started == 0 {
            return Err(EchoError::Runtime("no channel could be started".into()));
        }

        let channels: SharedChannels = Arc::new(RwLock::new(std::mem::take(&mut self.channels)));
        let tracker = TaskTracker::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                next = aggregate_rx.recv() => {
                    let Some((channel_id, event)) = next else {
                        info!("all channels closed");
                        break;
                    };
                    match event {
                        ChannelEvent::Message(msg) => {
                            let dispatcher = self.dispatcher.clone();
                            let channels = channels.clone();
                            tracker.spawn(async move {
                                let target = msg.target.clone();
                                // Inner task so a panicking handler is contained and reported.
                                let handle = tokio::spawn(process_message(
                                    dispatcher,
                                    channels.clone(),
                                    channel_id.clone(),
                                    msg,
                                ));
                                if let Err(e) = handle.await {
                                    error!(channel = %channel_id, error = %e, "message handler panicked");
                                    let outgoing = OutgoingMessage {
                                        channel: channel_id.clone(),
                                        target,
                                        response: Response::text(HANDLER_CRASHED),
                                    };
                                    if let Err(e) = send_to_channel(&channels, outgoing).await {
                                        warn!(channel = %channel_id, error = %e, "failed to report handler panic");
                                    }
                                }
                            });
                        }
                        ChannelEvent::Ready { bot_id } => {
                            info!(channel = %channel_id, %bot_id, "bot identity established");
                            self.dispatcher.set_bot_identity(bot_id);
                        }
                        ChannelEvent::Connected => {
                            info!(channel = %channel_id, "channel connected");
                        }
                        ChannelEvent::Disconnected(reason) => {
                            warn!(channel = %channel_id, ?reason, "channel disconnected");
                        }
                    }
                }
            }
        }

        tracker.close();
        if tokio::time::timeout(self.drain_timeout, tracker.wait()).await.is_err() {
            warn!(
                pending = tracker.len(),
                timeout = ?self.drain_timeout,
                "in-flight handlers did not finish before shutdown"
            );
        } else {
            debug!("in-flight handlers drained");
        }

        // A stuck handler may still hold a read guard.
        match tokio::time::timeout(self.drain_timeout, channels.write()).await {
            Ok(mut channels) => {
                for channel in channels.iter_mut() {
                    if let Err(e) = channel.stop().await {
                        warn!(channel = channel.id(), error = %e, "failed to stop channel");
                    }
                }
            }
            Err(_) => warn!("channels still in use, skipping graceful stop"),
        }

        info!("echo runtime stopped");
        Ok(())
    }
}

async fn process_message(
    dispatcher: Arc<Dispatcher>,
    channels: SharedChannels,
    channel_id: String,
    msg: IncomingMessage,
) {
    let latency = channels
        .read()
        .await
        .iter()
        .find(|c| c.id() == channel_id)
        .and_then(|c| c.latency());

    let Some(response) = dispatcher.handle(&msg.event, latency).await else {
        return;
    };

    let outgoing = OutgoingMessage {
        channel: channel_id.clone(),
        target: msg.target.clone(),
        response,
    };
    let Err(e) = send_to_channel(&channels, outgoing).await else {
        return;
    };
    warn!(channel = %channel_id, message = %msg.id, error = %e, "failed to deliver response");

    // One short text reply in place of the rejected one.
    let fallback = OutgoingMessage {
        channel: channel_id.clone(),
        target: msg.target,
        response: Response::text(DELIVERY_FAILED),
    };
    if let Err(e) = send_to_channel(&channels, fallback).await {
        warn!(channel = %channel_id, message = %msg.id, error = %e, "failed to deliver fallback");
    }
}

async fn send_to_channel(channels: &SharedChannels, message: OutgoingMessage) -> Result<()> {
    let channels = channels.read().await;
    match channels.iter().find(|c| c.id() == message.channel) {
        Some(channel) => channel.send(message).await,
        None => {
            warn!(channel = %message.channel, "channel not found for response");
            Ok(())
        }
    }
}
