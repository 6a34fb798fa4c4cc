// src/notify/mod.rs
//! Push side of the bot: subscriber fan-out and thumbnail downloads.

pub mod broadcast;
pub mod media;

pub use broadcast::{BroadcastReport, Broadcaster, Delivery};
pub use media::{HttpMediaFetcher, MediaError, MediaFetcher};
