pub mod bot;

pub use bot::{BotConfig, TransportKind};
