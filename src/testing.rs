// src/testing.rs
//! In-memory fakes for the news API, the chat transport and media downloads.
//! Shared by unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::news::{Article, ArticleId, Endpoint, NewsApi, NewsError};
use crate::notify::{MediaError, MediaFetcher};
use crate::transport::{ChatId, ChatTransport, Media, OutgoingContent, TransportError};

fn unavailable(endpoint: Endpoint) -> NewsError {
    NewsError::Status {
        endpoint,
        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Scripted news API. `latest` pops queued responses in order and keeps
/// repeating the last one once the queue runs dry.
#[derive(Default)]
pub struct ScriptedNews {
    latest: Mutex<VecDeque<Option<Vec<Article>>>>,
    last_latest: Mutex<Option<Option<Vec<Article>>>>,
    articles: Mutex<HashMap<ArticleId, Article>>,
    breaking: Mutex<Option<Vec<Article>>>,
    search: Mutex<Option<Vec<Article>>>,
    fail_all: AtomicBool,
    latest_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one `latest` response holding just `items`.
    pub fn push_latest(&self, items: Vec<Article>) -> &Self {
        self.latest.lock().unwrap().push_back(Some(items));
        self
    }

    /// Queue one failing `latest` response.
    pub fn push_latest_error(&self) -> &Self {
        self.latest.lock().unwrap().push_back(None);
        self
    }

    pub fn add_article(&self, article: Article) -> &Self {
        self.articles.lock().unwrap().insert(article.id.clone(), article);
        self
    }

    pub fn set_breaking(&self, items: Vec<Article>) -> &Self {
        *self.breaking.lock().unwrap() = Some(items);
        self
    }

    pub fn set_search(&self, items: Vec<Article>) -> &Self {
        *self.search.lock().unwrap() = Some(items);
        self
    }

    /// Make every endpoint fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }

    pub fn set_latest_delay(&self, delay: Duration) {
        *self.latest_delay.lock().unwrap() = Some(delay);
    }

    /// Calls made so far, as `endpoint` or `endpoint:arg`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn failing(&self) -> bool {
        self.fail_all.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsApi for ScriptedNews {
    async fn breaking(&self, limit: usize) -> Result<Vec<Article>, NewsError> {
        self.record("breaking-news".to_string());
        if self.failing() {
            return Err(unavailable(Endpoint::Breaking));
        }
        let items = self.breaking.lock().unwrap().clone().unwrap_or_default();
        Ok(items.into_iter().take(limit).collect())
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Article>, NewsError> {
        self.record(format!("latest-news:{limit}"));
        let delay = *self.latest_delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.failing() {
            return Err(unavailable(Endpoint::Latest));
        }

        let next = self.latest.lock().unwrap().pop_front();
        let response = match next {
            Some(r) => {
                *self.last_latest.lock().unwrap() = Some(r.clone());
                r
            }
            None => self.last_latest.lock().unwrap().clone().unwrap_or(Some(Vec::new())),
        };
        match response {
            Some(items) => Ok(items.into_iter().take(limit).collect()),
            None => Err(unavailable(Endpoint::Latest)),
        }
    }

    async fn article(&self, id: &ArticleId) -> Result<Article, NewsError> {
        self.record(format!("article:{id}"));
        if self.failing() {
            return Err(unavailable(Endpoint::Article));
        }
        self.articles
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| NewsError::NotFound(id.clone()))
    }

    async fn search(&self, query: &str) -> Result<Vec<Article>, NewsError> {
        self.record(format!("search:{query}"));
        if self.failing() {
            return Err(unavailable(Endpoint::Search));
        }
        Ok(self.search.lock().unwrap().clone().unwrap_or_default())
    }
}

/// Transport that records every successful send and fails for chosen chats.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ChatId, OutgoingContent)>>,
    failing: Mutex<Vec<ChatId>>,
    attempts: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, chat: impl Into<ChatId>) {
        self.failing.lock().unwrap().push(chat.into());
    }

    pub fn sent(&self) -> Vec<(ChatId, OutgoingContent)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat: &ChatId) -> Vec<OutgoingContent> {
        self.sent()
            .into_iter()
            .filter(|(c, _)| c == chat)
            .map(|(_, m)| m)
            .collect()
    }

    /// Send attempts, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(&self, chat: &ChatId, content: &OutgoingContent) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(chat) {
            return Err(TransportError::Rejected {
                status: 500,
                body: format!("send to {chat} failed"),
            });
        }
        self.sent.lock().unwrap().push((chat.clone(), content.clone()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Media fetcher returning a fixed image, or always failing.
pub struct StaticMedia {
    media: Option<Media>,
    calls: Mutex<Vec<String>>,
}

impl StaticMedia {
    pub fn ok() -> Self {
        Self {
            media: Some(Media {
                mime_type: "image/jpeg".to_string(),
                data: vec![0xFF, 0xD8, 0xFF],
                file_name: Some("thumb.jpg".to_string()),
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            media: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for StaticMedia {
    async fn fetch(&self, url: &str) -> Result<Media, MediaError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.media.clone().ok_or(MediaError::Empty)
    }
}
