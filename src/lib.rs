// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod commands;
pub mod config;
pub mod guard;
pub mod metrics;
pub mod news;
pub mod notify;
pub mod poller;
pub mod scheduler;
pub mod status;
pub mod subscriptions;
pub mod transport;

// Test doubles shared with tests/
pub mod testing;

// ---- Re-exports for stable public API ----
pub use crate::commands::{Command, CommandRouter};
pub use crate::config::{BotConfig, TransportKind};
pub use crate::news::{Article, ArticleId, HttpNewsClient, NewsApi, NewsError};
pub use crate::notify::{BroadcastReport, Broadcaster};
pub use crate::poller::{NewsPoller, PollerConfig, TickOutcome};
pub use crate::status::{create_router, AppState, ConnectionState};
pub use crate::subscriptions::SubscriptionRegistry;
pub use crate::transport::{ChatId, ChatTransport, InboundMessage, OutgoingContent};
