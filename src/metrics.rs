// src/metrics.rs
use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and describe the bot's series.
    /// Call once per process.
    pub fn install() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("poller_ticks_total", "Poll ticks, labelled by outcome.");
        describe_counter!("poller_new_articles_total", "New article ids detected.");
        describe_gauge!("poller_last_tick_ts", "Unix ts of the last poll tick.");
        describe_counter!("broadcast_deliveries_total", "Notifications delivered to a chat.");
        describe_counter!("broadcast_failures_total", "Notification deliveries that failed.");
        describe_counter!("commands_total", "Chat commands handled, labelled by command.");
        describe_counter!("news_api_errors_total", "Failed news API calls, labelled by endpoint.");
        describe_gauge!("subscribers", "Chats subscribed to new-article alerts.");
    });
}
