// tests/event_bus.rs
use std::sync::{Arc, Mutex};
use std::time::Duration;

use news_alert_bot::transport::{EventBus, InboundMessage, TransportEvent};

type Log = Arc<Mutex<Vec<String>>>;

async fn wait_for(log: &Log, n: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while log.lock().unwrap().len() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("handlers did not finish in time");
}

#[tokio::test]
async fn handlers_run_in_registration_order_per_event() {
    let log: Log = Arc::default();
    let mut bus = EventBus::new();
    for name in ["first", "second"] {
        let log = log.clone();
        bus.on_message(move |msg: InboundMessage| {
            let log = log.clone();
            async move {
                if name == "first" {
                    // Slower first handler must still finish before the second starts.
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                log.lock().unwrap().push(format!("{name}:{}", msg.body));
            }
        });
    }
    let events = bus.start();

    for body in ["a", "b"] {
        events
            .emit(TransportEvent::Message(InboundMessage::new("c1", body)))
            .await
            .unwrap();
    }
    wait_for(&log, 4).await;
    assert_eq!(
        *log.lock().unwrap(),
        vec!["first:a", "second:a", "first:b", "second:b"]
    );
}

#[tokio::test]
async fn panicking_handler_does_not_stop_dispatch() {
    let log: Log = Arc::default();
    let mut bus = EventBus::new();
    bus.on_qr(|code: String| async move {
        if code == "bad" {
            panic!("Execution context was destroyed");
        }
    });
    {
        let log = log.clone();
        bus.on_qr(move |code: String| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(code);
            }
        });
    }
    let events = bus.start();

    events.emit(TransportEvent::Qr("bad".into())).await.unwrap();
    events.emit(TransportEvent::Qr("good".into())).await.unwrap();
    wait_for(&log, 2).await;
    assert_eq!(*log.lock().unwrap(), vec!["bad", "good"]);
}

#[tokio::test]
async fn events_without_handlers_are_accepted() {
    let events = EventBus::new().start();
    events.emit(TransportEvent::Ready).await.unwrap();
    events
        .emit(TransportEvent::Disconnected("logout".into()))
        .await
        .unwrap();
}
