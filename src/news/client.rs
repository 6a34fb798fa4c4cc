// src/news/client.rs
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{Article, ArticleId, Endpoint, NewsApi, NewsError};

/// Every API response wraps its payload as `{ "data": ... }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// reqwest-backed client for the news API.
#[derive(Debug, Clone)]
pub struct HttpNewsClient {
    http: Client,
    base: Url,
}

impl HttpNewsClient {
    /// `timeout` bounds each request end to end; connect gets a shorter budget.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NewsError> {
        let base = Url::parse(base_url.trim())
            .map_err(|_| NewsError::InvalidBaseUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(NewsError::InvalidBaseUrl(base_url.to_string()));
        }

        let http = Client::builder()
            .user_agent(concat!("news-alert-bot/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .build()
            .map_err(NewsError::Client)?;

        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, NewsError> {
        let result = self.fetch_envelope(endpoint, url, query).await;
        if let Err(e) = &result {
            counter!("news_api_errors_total", "endpoint" => endpoint.as_str()).increment(1);
            tracing::debug!(target: "news", %endpoint, error = %e, "news api call failed");
        }
        result
    }

    async fn fetch_envelope<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, NewsError> {
        let transport_err = |source: reqwest::Error| {
            if source.is_timeout() {
                NewsError::Timeout { endpoint }
            } else {
                NewsError::Transport { endpoint, source }
            }
        };

        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(transport_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NewsError::Status { endpoint, status });
        }

        let body = resp.bytes().await.map_err(transport_err)?;
        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|source| NewsError::Malformed { endpoint, source })?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl NewsApi for HttpNewsClient {
    async fn breaking(&self, limit: usize) -> Result<Vec<Article>, NewsError> {
        let url = self.url_for(&["breaking-news"]);
        self.get_data(Endpoint::Breaking, url, &[("limit", limit.to_string())])
            .await
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Article>, NewsError> {
        let url = self.url_for(&["latest-news"]);
        self.get_data(Endpoint::Latest, url, &[("limit", limit.to_string())])
            .await
    }

    async fn article(&self, id: &ArticleId) -> Result<Article, NewsError> {
        let url = self.url_for(&["article", id.as_str()]);
        let found: Option<Article> = self.get_data(Endpoint::Article, url, &[]).await?;
        found.ok_or_else(|| NewsError::NotFound(id.clone()))
    }

    async fn search(&self, query: &str) -> Result<Vec<Article>, NewsError> {
        let url = self.url_for(&["search"]);
        self.get_data(Endpoint::Search, url, &[("q", query.to_string())])
            .await
    }
}
