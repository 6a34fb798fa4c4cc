//! News Alert Bot: binary entrypoint.
//! Wires the news client, transport, command router and poller, then serves
//! the status page until the process is stopped.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_alert_bot::{
    config::{BotConfig, TransportKind},
    guard,
    metrics::Metrics,
    news::HttpNewsClient,
    notify::{Broadcaster, HttpMediaFetcher},
    poller::{NewsPoller, PollerConfig},
    scheduler::spawn_poller_startup,
    status::{create_router, AppState, ConnectionState},
    subscriptions::SubscriptionRegistry,
    transport::{
        console::{spawn_console_reader, ConsoleTransport, CONSOLE_CHAT},
        gateway::{webhook_router, GatewayTransport},
        ChatId, ChatTransport, EventBus,
    },
    CommandRouter,
};

/// Event targets used across the crate; all default to `info`.
const DEFAULT_FILTER: &str =
    "news_alert_bot=info,poller=info,broadcast=info,commands=info,transport=info,news=info,guard=info,warn";

/// Compact logs by default; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();
    guard::install_panic_hook();

    let cfg = BotConfig::load()?;
    tracing::info!(
        api = %cfg.news_api_url,
        port = cfg.port,
        interval_mins = cfg.poll_interval_mins,
        transport = ?cfg.transport,
        "starting news alert bot"
    );

    let metrics = Metrics::install()?;

    let news = Arc::new(HttpNewsClient::new(&cfg.news_api_url, cfg.http_timeout())?);
    let media = Arc::new(HttpMediaFetcher::new(cfg.http_timeout())?);
    let transport: Arc<dyn ChatTransport> = match cfg.transport {
        TransportKind::Gateway => Arc::new(GatewayTransport::new(
            &cfg.gateway_url,
            cfg.gateway_token.clone(),
            cfg.http_timeout(),
        )?),
        TransportKind::Console => Arc::new(ConsoleTransport::new()),
    };

    let registry = Arc::new(SubscriptionRegistry::new());
    let connection = ConnectionState::default();
    let broadcaster = Broadcaster::new(registry.clone(), transport.clone());
    let poller = Arc::new(NewsPoller::new(
        news.clone(),
        registry.clone(),
        broadcaster,
        media.clone(),
        PollerConfig {
            notify_after_failed_probe: cfg.notify_after_failed_probe,
        },
    ));
    let commands = Arc::new(CommandRouter::new(news, registry.clone(), media, transport.clone()));

    // --- Transport events ---
    let mut bus = EventBus::new();
    {
        let c = connection.clone();
        bus.on_qr(move |code| {
            let c = c.clone();
            async move {
                tracing::info!(target: "transport", "QR code received; scan it from the status page");
                c.set_qr(code);
            }
        });
    }
    {
        let c = connection.clone();
        bus.on_ready(move |()| {
            let c = c.clone();
            async move {
                tracing::info!(target: "transport", "WhatsApp session ready");
                c.set_ready();
            }
        });
    }
    {
        let commands = commands.clone();
        bus.on_message(move |msg| {
            let commands = commands.clone();
            async move {
                commands.handle(&msg).await;
            }
        });
    }
    {
        let c = connection.clone();
        bus.on_disconnected(move |reason| {
            let c = c.clone();
            async move {
                tracing::warn!(target: "transport", %reason, "WhatsApp session disconnected");
                c.set_disconnected();
            }
        });
    }
    let events = bus.start();

    // --- HTTP ---
    let state = AppState {
        connection,
        registry,
        poller: poller.clone(),
    };
    let mut app = create_router(state).merge(metrics.router());
    match cfg.transport {
        TransportKind::Gateway => {
            app = app.merge(webhook_router(events, cfg.webhook_token.clone()));
        }
        TransportKind::Console => {
            spawn_console_reader(events, ChatId::from(CONSOLE_CHAT));
        }
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "status server listening");

    // --- Poller ---
    // Started after the bind; the startup check can take a full HTTP timeout.
    spawn_poller_startup(poller, cfg.poll_interval());

    axum::serve(listener, app).await.context("status server")?;
    Ok(())
}
