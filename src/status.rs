// src/status.rs
//! Status web server: login state page, health probe, and a JSON snapshot.

use std::sync::{Arc, PoisonError, RwLock};

use axum::{extract::State, response::Html, routing::get, Json, Router};
use qrcode::{render::svg, QrCode};
use tower_http::cors::CorsLayer;

use crate::poller::{NewsPoller, PollerStatus};
use crate::subscriptions::SubscriptionRegistry;

pub const PAGE_CONNECTED: &str = "<h1>✅ Bot is connected and active!</h1>";
pub const PAGE_SCAN_HEADER: &str = "<h1>Scan this QR Code:</h1>";
pub const PAGE_WAITING: &str = "<h1>⏳ Generating QR Code... Please refresh in 10 seconds.</h1>";

#[derive(Debug, Default)]
struct ConnectionInner {
    connected: bool,
    qr: Option<String>,
}

/// Messaging session state as reported by transport events.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    inner: Arc<RwLock<ConnectionInner>>,
}

/// Which of the three status pages to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusView {
    Connected,
    AwaitingScan(String),
    Starting,
}

impl ConnectionState {
    pub fn set_qr(&self, code: String) {
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        g.qr = Some(code);
        g.connected = false;
    }

    pub fn set_ready(&self) {
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        g.connected = true;
        g.qr = None;
    }

    pub fn set_disconnected(&self) {
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        g.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).connected
    }

    pub fn view(&self) -> StatusView {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if g.connected {
            StatusView::Connected
        } else if let Some(qr) = &g.qr {
            StatusView::AwaitingScan(qr.clone())
        } else {
            StatusView::Starting
        }
    }
}

pub fn render_page(view: &StatusView) -> String {
    match view {
        StatusView::Connected => PAGE_CONNECTED.to_string(),
        StatusView::AwaitingScan(code) => format!("{PAGE_SCAN_HEADER}{}", qr_markup(code)),
        StatusView::Starting => PAGE_WAITING.to_string(),
    }
}

/// Inline markup for a login code. Gateways that already rendered the code
/// send a `data:image/...` URL; raw codes are drawn as SVG.
fn qr_markup(code: &str) -> String {
    if code.starts_with("data:image/") {
        return format!(
            r#"<img src="{}" alt="QR code">"#,
            html_escape::encode_double_quoted_attribute(code)
        );
    }
    match QrCode::new(code.as_bytes()) {
        Ok(qr) => qr
            .render::<svg::Color>()
            .min_dimensions(256, 256)
            .build(),
        Err(e) => {
            tracing::warn!(error = %e, "QR code could not be rendered");
            format!("<pre>{}</pre>", html_escape::encode_text(code))
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub connection: ConnectionState,
    pub registry: Arc<SubscriptionRegistry>,
    pub poller: Arc<NewsPoller>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status_page))
        .route("/health", get(|| async { "ok" }))
        .route("/status.json", get(status_json))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn status_page(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&state.connection.view()))
}

#[derive(serde::Serialize)]
struct StatusOut {
    connected: bool,
    awaiting_scan: bool,
    subscribers: usize,
    poller: PollerStatus,
}

async fn status_json(State(state): State<AppState>) -> Json<StatusOut> {
    let view = state.connection.view();
    Json(StatusOut {
        connected: view == StatusView::Connected,
        awaiting_scan: matches!(view, StatusView::AwaitingScan(_)),
        subscribers: state.registry.len(),
        poller: state.poller.status(),
    })
}
