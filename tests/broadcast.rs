// tests/broadcast.rs
use std::sync::Arc;

use news_alert_bot::notify::Broadcaster;
use news_alert_bot::subscriptions::SubscriptionRegistry;
use news_alert_bot::testing::RecordingTransport;
use news_alert_bot::transport::{ChatId, OutgoingContent};

fn setup(chats: &[&str]) -> (Arc<SubscriptionRegistry>, Arc<RecordingTransport>, Broadcaster) {
    let registry = Arc::new(SubscriptionRegistry::new());
    for c in chats {
        registry.subscribe(ChatId::from(*c));
    }
    let transport = Arc::new(RecordingTransport::new());
    let b = Broadcaster::new(registry.clone(), transport.clone());
    (registry, transport, b)
}

#[tokio::test]
async fn one_failing_chat_does_not_stop_the_rest() {
    let (_registry, transport, b) = setup(&["c1", "c2", "c3"]);
    transport.fail_for("c2");

    let report = b.broadcast(&OutgoingContent::text("hello")).await;

    assert_eq!(transport.attempts(), 3);
    assert_eq!(report.delivered(), 2);
    assert_eq!(report.failed(), 1);
    let failed: Vec<_> = report
        .deliveries
        .iter()
        .filter(|d| !d.is_ok())
        .map(|d| d.chat.as_str().to_string())
        .collect();
    assert_eq!(failed, vec!["c2".to_string()]);

    let delivered: Vec<_> = transport.sent().into_iter().map(|(c, _)| c).collect();
    assert_eq!(delivered, vec![ChatId::from("c1"), ChatId::from("c3")]);
}

#[tokio::test]
async fn empty_registry_sends_nothing() {
    let (_registry, transport, b) = setup(&[]);
    let report = b.broadcast(&OutgoingContent::text("hello")).await;
    assert!(report.is_empty());
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn unsubscribed_chat_is_not_reached() {
    let (registry, transport, b) = setup(&["c1", "c2"]);
    registry.unsubscribe(&ChatId::from("c1"));

    b.broadcast(&OutgoingContent::text("hello")).await;
    assert!(transport.sent_to(&ChatId::from("c1")).is_empty());
    assert_eq!(transport.sent_to(&ChatId::from("c2")).len(), 1);
}
