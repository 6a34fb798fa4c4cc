// src/transport/console.rs
//! Local development transport: stdin lines become messages from a single
//! chat, outgoing messages are printed to stdout.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;

use super::{ChatId, ChatTransport, EventSender, InboundMessage, OutgoingContent, TransportError, TransportEvent};

pub const CONSOLE_CHAT: &str = "console";

#[derive(Debug, Default, Clone)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Render a message the way the console shows it.
pub fn render(chat: &ChatId, content: &OutgoingContent) -> String {
    match content {
        OutgoingContent::Text(text) => format!("[{chat}] {text}\n"),
        OutgoingContent::Media { media, caption } => format!(
            "[{chat}] <{} {} bytes> {}\n",
            media.mime_type,
            media.data.len(),
            caption.as_deref().unwrap_or_default()
        ),
    }
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send(&self, chat: &ChatId, content: &OutgoingContent) -> Result<(), TransportError> {
        let mut out = tokio::io::stdout();
        out.write_all(render(chat, content).as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// Emit `Ready`, then forward every non-empty stdin line as a message from `chat`.
pub fn spawn_console_reader(events: EventSender, chat: ChatId) -> JoinHandle<()> {
    tokio::spawn(async move {
        if events.emit(TransportEvent::Ready).await.is_err() {
            return;
        }
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    let msg = InboundMessage::new(chat.clone(), line);
                    if events.emit(TransportEvent::Message(msg)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(target: "transport", error = %e, "stdin read failed");
                    break;
                }
            }
        }
        tracing::info!(target: "transport", "console input closed");
    })
}
