// src/poller.rs
//! New-article detection: poll the latest article, diff its id against the
//! last one seen, and broadcast a notification when it changes.
//!
//! The id is advanced *before* delivery. A failed detail fetch or a failed
//! send therefore drops that notification instead of repeating it next tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;

use crate::news::{format, Article, ArticleId, NewsApi};
use crate::notify::{media, BroadcastReport, Broadcaster, MediaFetcher};
use crate::subscriptions::SubscriptionRegistry;

#[derive(Debug, Clone, Copy, Default)]
pub struct PollerConfig {
    /// When the startup probe failed, notify for the first article a later
    /// tick sees instead of silently taking it as the baseline.
    pub notify_after_failed_probe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerPhase {
    #[default]
    Uninitialized,
    Ready,
}

/// Read-only view of the poller for the status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollerStatus {
    pub phase: PollerPhase,
    pub last_seen: Option<ArticleId>,
    pub last_tick_at: Option<DateTime<Utc>>,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    SkippedNoSubscribers,
    /// Another tick was still running.
    SkippedBusy,
    FetchFailed,
    NoNewArticle,
    /// First successful fetch after a failed probe; recorded without notifying.
    Baseline(Option<ArticleId>),
    /// Id advanced but the full article could not be fetched.
    DetailFetchFailed(ArticleId),
    Notified {
        article: ArticleId,
        report: BroadcastReport,
    },
}

impl TickOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TickOutcome::SkippedNoSubscribers => "skipped_no_subscribers",
            TickOutcome::SkippedBusy => "skipped_busy",
            TickOutcome::FetchFailed => "fetch_failed",
            TickOutcome::NoNewArticle => "no_new_article",
            TickOutcome::Baseline(_) => "baseline",
            TickOutcome::DetailFetchFailed(_) => "detail_fetch_failed",
            TickOutcome::Notified { .. } => "notified",
        }
    }
}

pub struct NewsPoller {
    news: Arc<dyn NewsApi>,
    registry: Arc<SubscriptionRegistry>,
    broadcaster: Broadcaster,
    media: Arc<dyn MediaFetcher>,
    cfg: PollerConfig,
    state: Mutex<PollerStatus>,
    // Held for a whole tick so ticks never overlap.
    tick_guard: tokio::sync::Mutex<()>,
}

impl NewsPoller {
    pub fn new(
        news: Arc<dyn NewsApi>,
        registry: Arc<SubscriptionRegistry>,
        broadcaster: Broadcaster,
        media: Arc<dyn MediaFetcher>,
        cfg: PollerConfig,
    ) -> Self {
        Self {
            news,
            registry,
            broadcaster,
            media,
            cfg,
            state: Mutex::new(PollerStatus::default()),
            tick_guard: tokio::sync::Mutex::new(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, PollerStatus> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> PollerStatus {
        self.state().clone()
    }

    pub fn last_seen(&self) -> Option<ArticleId> {
        self.state().last_seen.clone()
    }

    /// Startup probe: remember the current latest article without notifying.
    /// On failure the poller stays uninitialized and keeps running.
    pub async fn initialize(&self) -> PollerPhase {
        let _tick = self.tick_guard.lock().await;
        match self.news.latest(1).await {
            Ok(items) => {
                let id = items.into_iter().next().map(|a| a.id);
                let mut st = self.state();
                st.last_seen = id.clone();
                st.phase = PollerPhase::Ready;
                tracing::info!(target: "poller", last_seen = ?id, "startup probe done");
                PollerPhase::Ready
            }
            Err(e) => {
                tracing::warn!(target: "poller", error = %e, "startup probe failed; poller stays live");
                self.state().phase
            }
        }
    }

    /// One polling tick. Never fails; the outcome says which branch ran.
    pub async fn poll(&self) -> TickOutcome {
        let Ok(_tick) = self.tick_guard.try_lock() else {
            tracing::debug!(target: "poller", "previous tick still running");
            return self.finish(TickOutcome::SkippedBusy);
        };

        if self.registry.is_empty() {
            return self.finish(TickOutcome::SkippedNoSubscribers);
        }

        let latest = match self.news.latest(1).await {
            Ok(items) => items.into_iter().next(),
            Err(e) => {
                tracing::warn!(target: "poller", error = %e, "latest-news fetch failed");
                return self.finish(TickOutcome::FetchFailed);
            }
        };

        let new_id = {
            let mut st = self.state();
            if st.phase == PollerPhase::Uninitialized {
                st.phase = PollerPhase::Ready;
                if !self.cfg.notify_after_failed_probe {
                    st.last_seen = latest.as_ref().map(|a| a.id.clone());
                    tracing::info!(target: "poller", last_seen = ?st.last_seen, "baseline taken after failed probe");
                    let baseline = st.last_seen.clone();
                    drop(st);
                    return self.finish(TickOutcome::Baseline(baseline));
                }
            }

            match latest {
                Some(a) if st.last_seen.as_ref() != Some(&a.id) => {
                    st.last_seen = Some(a.id.clone());
                    a.id
                }
                _ => {
                    drop(st);
                    return self.finish(TickOutcome::NoNewArticle);
                }
            }
        };

        counter!("poller_new_articles_total").increment(1);
        tracing::info!(target: "poller", article = %new_id, "new article detected");

        let article = match self.news.article(&new_id).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(target: "poller", article = %new_id, error = %e, "article fetch failed; notification dropped");
                return self.finish(TickOutcome::DetailFetchFailed(new_id));
            }
        };

        let content = self.compose(&article).await;
        let report = self.broadcaster.broadcast(&content).await;
        self.finish(TickOutcome::Notified {
            article: new_id,
            report,
        })
    }

    async fn compose(&self, article: &Article) -> crate::transport::OutgoingContent {
        let text = format::notification(article);
        media::with_thumbnail(self.media.as_ref(), text, article.thumbnail()).await
    }

    fn finish(&self, outcome: TickOutcome) -> TickOutcome {
        // A skipped-busy call is not a tick of its own; the running one records the time.
        if outcome != TickOutcome::SkippedBusy {
            let now = Utc::now();
            self.state().last_tick_at = Some(now);
            gauge!("poller_last_tick_ts").set(now.timestamp() as f64);
        }
        counter!("poller_ticks_total", "outcome" => outcome.label()).increment(1);
        outcome
    }
}
