//! Runs the startup probe and one poll tick against the live news API, with a
//! single stdout subscriber. `--notify-latest` skips the probe so the current
//! latest article is pushed as if it were new.

use std::sync::Arc;

use news_alert_bot::{
    config::BotConfig,
    news::HttpNewsClient,
    notify::{Broadcaster, HttpMediaFetcher},
    poller::{NewsPoller, PollerConfig, TickOutcome},
    subscriptions::SubscriptionRegistry,
    transport::{console::ConsoleTransport, ChatId},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let notify_latest = std::env::args().skip(1).any(|a| a == "--notify-latest");
    let cfg = BotConfig::load()?;

    let news = Arc::new(HttpNewsClient::new(&cfg.news_api_url, cfg.http_timeout())?);
    let media = Arc::new(HttpMediaFetcher::new(cfg.http_timeout())?);
    let registry = Arc::new(SubscriptionRegistry::new());
    registry.subscribe(ChatId::from("stdout"));

    let broadcaster = Broadcaster::new(registry.clone(), Arc::new(ConsoleTransport::new()));
    let poller = NewsPoller::new(
        news,
        registry,
        broadcaster,
        media,
        PollerConfig {
            notify_after_failed_probe: notify_latest,
        },
    );

    if !notify_latest {
        let phase = poller.initialize().await;
        println!("probe: {phase:?}, last seen {:?}", poller.last_seen());
    }

    let outcome = poller.poll().await;
    match &outcome {
        TickOutcome::Notified { article, report } => {
            println!("tick: notified {article}");
            for d in &report.deliveries {
                match &d.error {
                    None => println!("  {} ok", d.chat),
                    Some(e) => println!("  {} failed: {e}", d.chat),
                }
            }
        }
        other => println!("tick: {}", other.label()),
    }

    println!("poll-probe done");
    Ok(())
}
