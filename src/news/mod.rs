// src/news/mod.rs
//! News API surface: article records, the read-only client trait, and
//! the error taxonomy shared by every caller.

pub mod client;
pub mod format;
pub mod text;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub use client::HttpNewsClient;

/// Opaque article identifier. The API emits ids as either JSON strings or
/// numbers; both collapse into the same textual form so comparisons are stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ArticleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'de> Deserialize<'de> for ArticleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s.trim().to_string()),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

/// One news item as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    #[serde(alias = "title")]
    pub headline: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "date")]
    pub published_date: Option<String>,
    #[serde(default, alias = "content")]
    pub full_text: Option<String>,
    #[serde(default, alias = "thumbnail", alias = "image")]
    pub thumbnail_url: Option<String>,
}

impl Article {
    pub fn new(id: impl Into<ArticleId>, headline: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            headline: headline.into(),
            url: url.into(),
            published_date: None,
            full_text: None,
            thumbnail_url: None,
        }
    }

    pub fn with_published_date(mut self, date: impl Into<String>) -> Self {
        self.published_date = Some(date.into());
        self
    }

    pub fn with_full_text(mut self, text: impl Into<String>) -> Self {
        self.full_text = Some(text.into());
        self
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// Thumbnail URL, ignoring blank strings the API sometimes sends.
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// The four read-only endpoints, used as log fields and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Breaking,
    Latest,
    Article,
    Search,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Breaking => "breaking-news",
            Endpoint::Latest => "latest-news",
            Endpoint::Article => "article",
            Endpoint::Search => "search",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("failed to build news api client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid news api base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("{endpoint} request timed out")]
    Timeout { endpoint: Endpoint },
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: Endpoint,
        status: reqwest::StatusCode,
    },
    #[error("{endpoint} returned a malformed body: {source}")]
    Malformed {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
    #[error("article {0} not found")]
    NotFound(ArticleId),
}

/// Read-only access to the news API.
#[async_trait::async_trait]
pub trait NewsApi: Send + Sync {
    async fn breaking(&self, limit: usize) -> Result<Vec<Article>, NewsError>;
    async fn latest(&self, limit: usize) -> Result<Vec<Article>, NewsError>;
    async fn article(&self, id: &ArticleId) -> Result<Article, NewsError>;
    async fn search(&self, query: &str) -> Result<Vec<Article>, NewsError>;
}
