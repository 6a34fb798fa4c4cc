// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::poller::{NewsPoller, TickOutcome};

/// Spawn the periodic poll loop. The first tick fires one `interval` after
/// start; each tick is awaited before the next, and ticks missed while a slow
/// one runs are skipped rather than bunched up.
pub fn spawn_poll_scheduler(poller: Arc<NewsPoller>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(run_ticks(poller, interval))
}

/// Run the startup check and then the poll loop on a spawned task. The caller
/// never waits on the news API.
pub fn spawn_poller_startup(poller: Arc<NewsPoller>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        poller.initialize().await;
        run_ticks(poller, interval).await;
    })
}

async fn run_ticks(poller: Arc<NewsPoller>, interval: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(target: "poller", interval_secs = interval.as_secs(), "poll scheduler started");

    loop {
        ticker.tick().await;
        let outcome = poller.poll().await;
        match &outcome {
            TickOutcome::Notified { article, report } => tracing::info!(
                target: "poller",
                %article,
                delivered = report.delivered(),
                failed = report.failed(),
                "poll tick"
            ),
            other => tracing::debug!(target: "poller", outcome = other.label(), "poll tick"),
        }
    }
}
