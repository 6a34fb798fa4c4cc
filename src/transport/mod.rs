// src/transport/mod.rs
//! Messaging transport seam: chat addressing, message payloads, the send
//! capability, and the inbound event bus.

pub mod console;
pub mod events;
pub mod gateway;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use events::{EventBus, EventSender, TransportEvent};

/// Opaque address of a conversation (e.g. `12025550123@c.us`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ChatId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: ChatId,
    pub body: String,
    /// Set when the linked account sent the message itself.
    pub from_me: bool,
}

impl InboundMessage {
    pub fn new(from: impl Into<ChatId>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: body.into(),
            from_me: false,
        }
    }
}

/// Downloaded attachment ready to be sent.
#[derive(Clone, PartialEq, Eq)]
pub struct Media {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub file_name: Option<String>,
}

impl fmt::Debug for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Media")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .field("file_name", &self.file_name)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingContent {
    Text(String),
    Media {
        media: Media,
        caption: Option<String>,
    },
}

impl OutgoingContent {
    pub fn text(s: impl Into<String>) -> Self {
        OutgoingContent::Text(s.into())
    }

    /// The human-readable part: the text itself or the media caption.
    pub fn text_part(&self) -> &str {
        match self {
            OutgoingContent::Text(t) => t,
            OutgoingContent::Media { caption, .. } => caption.as_deref().unwrap_or_default(),
        }
    }

    pub fn has_media(&self) -> bool {
        matches!(self, OutgoingContent::Media { .. })
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build transport client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid gateway url '{0}'")]
    InvalidUrl(String),
    #[error("send request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("gateway rejected message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("console output failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("event stream closed")]
    Closed,
}

/// Outbound half of the messaging transport.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, chat: &ChatId, content: &OutgoingContent) -> Result<(), TransportError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
