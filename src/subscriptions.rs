//! In-memory set of chats that opted into new-article alerts.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use metrics::gauge;

use crate::transport::ChatId;

/// Thread-safe subscriber set. Empty at startup, lives for the process.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<BTreeSet<ChatId>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<ChatId>> {
        // The set stays consistent even if a holder panicked mid-call.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `chat`. Returns `true` if it was not subscribed before.
    pub fn subscribe(&self, chat: ChatId) -> bool {
        let mut set = self.lock();
        let added = set.insert(chat);
        gauge!("subscribers").set(set.len() as f64);
        added
    }

    /// Remove `chat`. Returns `true` if it was subscribed.
    pub fn unsubscribe(&self, chat: &ChatId) -> bool {
        let mut set = self.lock();
        let removed = set.remove(chat);
        gauge!("subscribers").set(set.len() as f64);
        removed
    }

    pub fn contains(&self, chat: &ChatId) -> bool {
        self.lock().contains(chat)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Point-in-time copy; later (un)subscribes do not affect it.
    pub fn list_all(&self) -> Vec<ChatId> {
        self.lock().iter().cloned().collect()
    }
}
