use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use echo_core::{Author, Event};

use crate::adapter::*;

type Input = Box<dyn AsyncBufRead + Send + Unpin>;
type Output = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Console channel: every line on stdin is a message from the local
/// operator, and responses are printed to stdout.
pub struct ConsoleChannel {
    id: String,
    author: Author,
    /// Taken on `start`. Behind a lock so the channel stays `Sync`.
    input: Mutex<Option<Input>>,
    output: Output,
    connected: Arc<AtomicBool>,
    next_id: Arc<AtomicU64>,
}

impl ConsoleChannel {
    /// Console bound to the process's stdin/stdout.
    pub fn new(id: String, author: Author) -> Self {
        Self::with_io(
            id,
            author,
            Box::new(BufReader::new(tokio::io::stdin())),
            Box::new(tokio::io::stdout()),
        )
    }

    /// Console bound to arbitrary streams.
    pub fn with_io(
        id: String,
        author: Author,
        input: Input,
        output: Box<dyn AsyncWrite + Send + Unpin>,
    ) -> Self {
        Self {
            id,
            author,
            input: Mutex::new(Some(input)),
            output: Arc::new(Mutex::new(output)),
            connected: Arc::new(AtomicBool::new(false)),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The local operator, named after `$USER` when available.
    pub fn local_author() -> Author {
        let name = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "operator".into());
        Author::new(format!("console:{name}"), name)
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_type(&self) -> &str {
        "console"
    }

    async fn start(&mut self) -> echo_core::Result<mpsc::Receiver<ChannelEvent>> {
        let input = self
            .input
            .get_mut()
            .take()
            .ok_or_else(|| echo_core::EchoError::Channel {
                channel: "console".into(),
                reason: "console already started".into(),
            })?;
        let (event_tx, event_rx) = mpsc::channel(64);

        let channel_id = self.id.clone();
        let author = self.author.clone();
        let connected = self.connected.clone();
        let next_id = self.next_id.clone();
        connected.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let _ = event_tx.send(ChannelEvent::Connected).await;
            let mut lines = input.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                let id = next_id.fetch_add(1, Ordering::Relaxed);
                let incoming = IncomingMessage {
                    id: id.to_string(),
                    channel: channel_id.clone(),
                    target: "stdout".into(),
                    is_dm: true,
                    event: Event::new(author.clone(), line),
                };
                if event_tx.send(ChannelEvent::Message(incoming)).await.is_err() {
                    break;
                }
            }
            debug!("console input closed");
            connected.store(false, Ordering::SeqCst);
            let _ = event_tx
                .send(ChannelEvent::Disconnected(Some("end of input".into())))
                .await;
        });

        Ok(event_rx)
    }

    async fn send(&self, message: OutgoingMessage) -> echo_core::Result<()> {
        let text = format!("{}\n\n", message.response.to_plain_text());
        let mut out = self.output.lock().await;
        out.write_all(text.as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }

    async fn stop(&mut self) -> echo_core::Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
