// src/transport/gateway.rs
//! WhatsApp session gateway transport.
//!
//! The WhatsApp Web session (QR login, session storage, browser automation)
//! lives in a sidecar gateway. We talk to it over plain HTTP:
//! - outbound: `POST {gateway}/send` with a JSON message;
//! - inbound: the gateway posts events to our `/webhook` route.

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use base64::Engine as _;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{ChatId, ChatTransport, EventSender, InboundMessage, OutgoingContent, TransportError, TransportEvent};
use crate::guard;

pub const WEBHOOK_PATH: &str = "/webhook";
pub const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";

/// Response bodies longer than this are cut in error messages.
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Clone)]
pub struct GatewayTransport {
    http: Client,
    send_url: Url,
    token: Option<String>,
}

impl GatewayTransport {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, TransportError> {
        let mut send_url = Url::parse(base_url.trim())
            .map_err(|_| TransportError::InvalidUrl(base_url.to_string()))?;
        send_url
            .path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(base_url.to_string()))?
            .pop_if_empty()
            .push("send");

        let http = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            http,
            send_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn send_url(&self) -> &Url {
        &self.send_url
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    chat_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaPayload<'a>>,
}

#[derive(Serialize)]
struct MediaPayload<'a> {
    mimetype: &'a str,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<&'a str>,
}

impl<'a> SendRequest<'a> {
    fn build(chat: &'a ChatId, content: &'a OutgoingContent) -> Self {
        match content {
            OutgoingContent::Text(text) => Self {
                chat_id: chat.as_str(),
                text: Some(text),
                caption: None,
                media: None,
            },
            OutgoingContent::Media { media, caption } => Self {
                chat_id: chat.as_str(),
                text: None,
                caption: caption.as_deref(),
                media: Some(MediaPayload {
                    mimetype: &media.mime_type,
                    data: base64::engine::general_purpose::STANDARD.encode(&media.data),
                    filename: media.file_name.as_deref(),
                }),
            },
        }
    }
}

#[async_trait]
impl ChatTransport for GatewayTransport {
    async fn send(&self, chat: &ChatId, content: &OutgoingContent) -> Result<(), TransportError> {
        let body = SendRequest::build(chat, content);
        let mut req = self.http.post(self.send_url.clone()).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(TransportError::Request)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        Err(TransportError::Rejected {
            status: status.as_u16(),
            body: text.chars().take(MAX_ERROR_BODY).collect(),
        })
    }

    fn name(&self) -> &'static str {
        "gateway"
    }
}

/// Events the gateway posts to [`WEBHOOK_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum WebhookEvent {
    Qr {
        qr: String,
    },
    Ready,
    Message {
        from: String,
        #[serde(default)]
        body: String,
        #[serde(default, rename = "fromMe")]
        from_me: bool,
    },
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    /// Errors raised inside the gateway's WhatsApp client. Logged, never dispatched.
    Error {
        #[serde(default)]
        message: String,
    },
}

impl WebhookEvent {
    pub fn into_transport_event(self) -> Option<TransportEvent> {
        match self {
            WebhookEvent::Qr { qr } => Some(TransportEvent::Qr(qr)),
            WebhookEvent::Ready => Some(TransportEvent::Ready),
            WebhookEvent::Message { from, body, from_me } => Some(TransportEvent::Message(InboundMessage {
                from: ChatId::from(from),
                body,
                from_me,
            })),
            WebhookEvent::Disconnected { reason } => Some(TransportEvent::Disconnected(reason)),
            WebhookEvent::Error { .. } => None,
        }
    }
}

#[derive(Clone)]
struct WebhookState {
    events: EventSender,
    token: Option<String>,
}

/// Router exposing the gateway webhook. `token`, when set, must match the
/// `x-webhook-token` header of every call.
pub fn webhook_router(events: EventSender, token: Option<String>) -> Router {
    let state = WebhookState {
        events,
        token: token.filter(|t| !t.trim().is_empty()),
    };
    Router::new()
        .route(WEBHOOK_PATH, post(receive_webhook))
        .with_state(state)
}

async fn receive_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    Json(event): Json<WebhookEvent>,
) -> StatusCode {
    if let Some(expected) = &state.token {
        let given = headers
            .get(WEBHOOK_TOKEN_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        if given != expected {
            tracing::warn!(target: "transport", "webhook call with bad token rejected");
            return StatusCode::UNAUTHORIZED;
        }
    }

    if let WebhookEvent::Error { message } = &event {
        guard::report_transport_fault("gateway", message);
        return StatusCode::NO_CONTENT;
    }

    let Some(ev) = event.into_transport_event() else {
        return StatusCode::NO_CONTENT;
    };
    let kind = ev.kind();
    match state.events.emit(ev).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::error!(target: "transport", kind, error = %e, "dropping webhook event");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
