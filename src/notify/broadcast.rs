// src/notify/broadcast.rs
use std::sync::Arc;

use metrics::counter;

use crate::subscriptions::SubscriptionRegistry;
use crate::transport::{ChatId, ChatTransport, OutgoingContent};

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub chat: ChatId,
    /// `None` on success, the error text otherwise.
    pub error: Option<String>,
}

impl Delivery {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub deliveries: Vec<Delivery>,
}

impl BroadcastReport {
    pub fn delivered(&self) -> usize {
        self.deliveries.iter().filter(|d| d.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.deliveries.len() - self.delivered()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }
}

/// Best-effort fan-out to every subscribed chat.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<SubscriptionRegistry>,
    transport: Arc<dyn ChatTransport>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SubscriptionRegistry>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Send `content` to each chat in a registry snapshot. A failing chat is
    /// logged and recorded; it never stops the remaining deliveries. No retries.
    pub async fn broadcast(&self, content: &OutgoingContent) -> BroadcastReport {
        let chats = self.registry.list_all();
        let mut report = BroadcastReport {
            deliveries: Vec::with_capacity(chats.len()),
        };

        for chat in chats {
            let error = match self.transport.send(&chat, content).await {
                Ok(()) => {
                    counter!("broadcast_deliveries_total").increment(1);
                    None
                }
                Err(e) => {
                    counter!("broadcast_failures_total").increment(1);
                    tracing::warn!(
                        target: "broadcast",
                        chat = %chat,
                        transport = self.transport.name(),
                        error = %e,
                        "delivery failed"
                    );
                    Some(e.to_string())
                }
            };
            report.deliveries.push(Delivery { chat, error });
        }

        tracing::info!(
            target: "broadcast",
            delivered = report.delivered(),
            failed = report.failed(),
            media = content.has_media(),
            "broadcast finished"
        );
        report
    }
}
