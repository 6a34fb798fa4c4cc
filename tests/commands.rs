// tests/commands.rs
//
// Command replies against a scripted news API and a recording transport.

use std::sync::Arc;

use news_alert_bot::commands::CommandRouter;
use news_alert_bot::news::{format, Article};
use news_alert_bot::subscriptions::SubscriptionRegistry;
use news_alert_bot::testing::{RecordingTransport, ScriptedNews, StaticMedia};
use news_alert_bot::transport::{ChatId, InboundMessage, OutgoingContent};

struct Rig {
    news: Arc<ScriptedNews>,
    registry: Arc<SubscriptionRegistry>,
    transport: Arc<RecordingTransport>,
    router: CommandRouter,
}

fn rig() -> Rig {
    let news = Arc::new(ScriptedNews::new());
    let registry = Arc::new(SubscriptionRegistry::new());
    let transport = Arc::new(RecordingTransport::new());
    let router = CommandRouter::new(
        news.clone(),
        registry.clone(),
        Arc::new(StaticMedia::ok()),
        transport.clone(),
    );
    Rig {
        news,
        registry,
        transport,
        router,
    }
}

fn articles(n: usize) -> Vec<Article> {
    (1..=n)
        .map(|i| Article::new(format!("S{i}"), format!("Story {i}"), format!("https://news.example/{i}")))
        .collect()
}

/// Send `body` from `chat` and return the single reply text.
async fn ask(r: &Rig, chat: &str, body: &str) -> String {
    let before = r.transport.sent().len();
    assert!(r.router.handle(&InboundMessage::new(chat, body)).await, "no reply to {body}");
    let sent = r.transport.sent();
    assert_eq!(sent.len(), before + 1);
    sent[before].1.text_part().to_string()
}

#[tokio::test]
async fn search_shows_top_three_in_api_order() {
    let r = rig();
    r.news.set_search(articles(5));

    let reply = ask(&r, "u1", "!search hello").await;
    assert!(reply.contains("Story 1") && reply.contains("Story 2") && reply.contains("Story 3"));
    assert!(!reply.contains("Story 4"));
    assert!(reply.find("Story 1").unwrap() < reply.find("Story 3").unwrap());
    assert_eq!(r.news.calls(), vec!["search:hello".to_string()]);
}

#[tokio::test]
async fn search_with_no_hits_says_so() {
    let r = rig();
    r.news.set_search(vec![]);
    assert_eq!(ask(&r, "u1", "!search nothing here").await, format::NO_RESULTS);
    assert_eq!(r.news.calls(), vec!["search:nothing here".to_string()]);
}

#[tokio::test]
async fn api_failures_map_to_fixed_error_replies() {
    let r = rig();
    r.news.set_failing(true);
    assert_eq!(ask(&r, "u1", "!breaking").await, format::ERR_BREAKING);
    assert_eq!(ask(&r, "u1", "!latest").await, format::ERR_NEWS);
    assert_eq!(ask(&r, "u1", "!search x").await, format::ERR_SEARCH);
    assert_eq!(ask(&r, "u1", "!read 42").await, format::ERR_ARTICLE);
}

#[tokio::test]
async fn latest_and_breaking_ask_for_five() {
    let r = rig();
    r.news.push_latest(articles(7));
    r.news.set_breaking(articles(7));

    let latest = ask(&r, "u1", "!latest").await;
    assert!(latest.contains("Story 5") && !latest.contains("Story 6"));
    let breaking = ask(&r, "u1", "!breaking").await;
    assert!(breaking.contains("Story 5") && !breaking.contains("Story 6"));

    assert_eq!(
        r.news.calls(),
        vec!["latest-news:5".to_string(), "breaking-news".to_string()]
    );
}

#[tokio::test]
async fn read_sends_full_article_with_thumbnail() {
    let r = rig();
    r.news.add_article(
        Article::new("Ab12", "Big story", "https://news.example/ab12")
            .with_full_text("First&nbsp;line<br>Second line")
            .with_thumbnail("https://img.example/ab12.jpg"),
    );

    assert!(r.router.handle(&InboundMessage::new("u1", "!read Ab12")).await);
    let sent = r.transport.sent_to(&ChatId::from("u1"));
    assert_eq!(sent.len(), 1);
    let OutgoingContent::Media { caption, .. } = &sent[0] else {
        panic!("expected media reply, got {:?}", sent[0]);
    };
    let caption = caption.as_deref().unwrap_or_default();
    assert!(caption.contains("Big story"));
    assert!(caption.contains("Second line"));
    assert!(!caption.contains("<br>"));
    assert_eq!(r.news.calls(), vec!["article:Ab12".to_string()]);
}

#[tokio::test]
async fn subscribe_and_stop_are_idempotent() {
    let r = rig();
    let chat = ChatId::from("u1");

    assert_eq!(ask(&r, "u1", "!notify").await, format::SUBSCRIBED);
    assert_eq!(ask(&r, "u1", "!START").await, format::ALREADY_SUBSCRIBED);
    assert!(r.registry.contains(&chat));
    assert_eq!(r.registry.len(), 1);

    assert_eq!(ask(&r, "u1", "!stop").await, format::UNSUBSCRIBED);
    assert_eq!(ask(&r, "u1", "!stop").await, format::NOT_SUBSCRIBED);
    assert!(!r.registry.contains(&chat));
}

#[tokio::test]
async fn usage_replies_for_missing_arguments() {
    let r = rig();
    assert_eq!(ask(&r, "u1", "!search   ").await, format::USAGE_SEARCH);
    assert_eq!(ask(&r, "u1", "!read").await, format::USAGE_READ);
    assert!(r.news.calls().is_empty());
}

#[tokio::test]
async fn help_lists_every_command() {
    let r = rig();
    let help = ask(&r, "u1", "!help").await;
    for cmd in ["!latest", "!breaking", "!search", "!read", "!notify", "!stop"] {
        assert!(help.contains(cmd), "help misses {cmd}");
    }
}

#[tokio::test]
async fn non_commands_and_own_messages_get_no_reply() {
    let r = rig();
    for body in ["hello", "!unknown", "!latest now", ""] {
        assert!(!r.router.handle(&InboundMessage::new("u1", body)).await, "{body}");
    }

    let mut own = InboundMessage::new("u1", "!notify");
    own.from_me = true;
    assert!(!r.router.handle(&own).await);
    assert!(r.registry.is_empty());
    assert!(r.transport.sent().is_empty());
    assert!(r.news.calls().is_empty());
}

#[tokio::test]
async fn failed_reply_send_is_reported_not_raised() {
    let r = rig();
    r.transport.fail_for("u1");
    assert!(!r.router.handle(&InboundMessage::new("u1", "!help")).await);
    assert_eq!(r.transport.attempts(), 1);
}
