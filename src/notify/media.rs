// src/notify/media.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode, Url};
use thiserror::Error;

use crate::transport::{Media, OutgoingContent};

/// Thumbnails larger than this are not worth pushing through WhatsApp.
pub const MAX_MEDIA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to build media client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid media url '{0}'")]
    InvalidUrl(String),
    #[error("media download failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("media download returned HTTP {0}")]
    Status(StatusCode),
    #[error("media body was empty")]
    Empty,
    #[error("media is over the size limit ({0} bytes read)")]
    TooLarge(usize),
}

/// Fetch a remote file and turn it into sendable [`Media`].
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Media, MediaError>;
}

#[derive(Debug, Clone)]
pub struct HttpMediaFetcher {
    http: Client,
    max_bytes: usize,
}

impl HttpMediaFetcher {
    pub fn new(timeout: Duration) -> Result<Self, MediaError> {
        let http = Client::builder()
            .user_agent(concat!("news-alert-bot/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .build()
            .map_err(MediaError::Client)?;
        Ok(Self {
            http,
            max_bytes: MAX_MEDIA_BYTES,
        })
    }

    /// Override the download cap (defaults to [`MAX_MEDIA_BYTES`]).
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<Media, MediaError> {
        let parsed = Url::parse(url.trim()).map_err(|_| MediaError::InvalidUrl(url.to_string()))?;

        let resp = self
            .http
            .get(parsed.clone())
            .send()
            .await
            .map_err(MediaError::Request)?;
        if !resp.status().is_success() {
            return Err(MediaError::Status(resp.status()));
        }
        if let Some(len) = resp.content_length() {
            if len as usize > self.max_bytes {
                return Err(MediaError::TooLarge(len as usize));
            }
        }

        let header_mime = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty() && v != "application/octet-stream");

        let data = read_capped(resp, self.max_bytes).await?;
        if data.is_empty() {
            return Err(MediaError::Empty);
        }

        let file_name = file_name_of(&parsed);
        let mime_type = header_mime
            .or_else(|| file_name.as_deref().and_then(mime_from_extension).map(str::to_string))
            .unwrap_or_else(|| "image/jpeg".to_string());

        Ok(Media {
            mime_type,
            data,
            file_name,
        })
    }
}

/// Read the body chunk by chunk, giving up as soon as it passes `limit`.
/// Chunked responses carry no Content-Length, so the cap is enforced here.
async fn read_capped(mut resp: reqwest::Response, limit: usize) -> Result<Vec<u8>, MediaError> {
    let mut data = Vec::new();
    while let Some(chunk) = resp.chunk().await.map_err(MediaError::Request)? {
        if data.len() + chunk.len() > limit {
            return Err(MediaError::TooLarge(data.len() + chunk.len()));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

fn file_name_of(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segs| segs.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Attach the thumbnail at `thumbnail` to `text` when it downloads; otherwise
/// fall back to the plain text. A failed download never blocks the message.
pub async fn with_thumbnail(
    fetcher: &dyn MediaFetcher,
    text: String,
    thumbnail: Option<&str>,
) -> OutgoingContent {
    let Some(url) = thumbnail else {
        return OutgoingContent::Text(text);
    };
    match fetcher.fetch(url).await {
        Ok(media) => OutgoingContent::Media {
            media,
            caption: Some(text),
        },
        Err(e) => {
            tracing::warn!(target: "broadcast", %url, error = %e, "thumbnail unavailable, sending text only");
            OutgoingContent::Text(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_and_extension_guess() {
        let u = Url::parse("https://cdn.example.com/img/photo.PNG?w=300").unwrap();
        assert_eq!(file_name_of(&u).as_deref(), Some("photo.PNG"));
        assert_eq!(mime_from_extension("photo.PNG"), Some("image/png"));
        assert_eq!(mime_from_extension("noext"), None);

        let root = Url::parse("https://cdn.example.com/").unwrap();
        assert_eq!(file_name_of(&root), None);
    }
}
