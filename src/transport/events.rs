// src/transport/events.rs
//! Inbound transport events with named handler registration.
//!
//! Handlers of one kind run in registration order, and every handler for an
//! event finishes before the next event of that kind is dispatched. Kinds are
//! dispatched independently, so a slow `!search` reply never delays a QR update.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::{InboundMessage, TransportError};
use crate::guard;

/// Queue depth per event kind before `emit` starts applying backpressure.
const EVENT_QUEUE_DEPTH: usize = 64;

pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
type Handler<T> = Arc<dyn Fn(T) -> HandlerFuture + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A fresh login code to be scanned from the phone.
    Qr(String),
    /// Session authenticated and ready to send.
    Ready,
    Message(InboundMessage),
    Disconnected(String),
}

impl TransportEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportEvent::Qr(_) => "qr",
            TransportEvent::Ready => "ready",
            TransportEvent::Message(_) => "message",
            TransportEvent::Disconnected(_) => "disconnected",
        }
    }
}

#[derive(Default)]
pub struct EventBus {
    qr: Vec<Handler<String>>,
    ready: Vec<Handler<()>>,
    message: Vec<Handler<InboundMessage>>,
    disconnected: Vec<Handler<String>>,
}

fn boxed<T, F, Fut>(f: F) -> Handler<T>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |v| Box::pin(f(v)) as HandlerFuture)
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_qr<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.qr.push(boxed(f));
        self
    }

    pub fn on_ready<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(()) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.ready.push(boxed(f));
        self
    }

    pub fn on_message<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(InboundMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.message.push(boxed(f));
        self
    }

    pub fn on_disconnected<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.disconnected.push(boxed(f));
        self
    }

    /// Freeze the handler lists and spawn one dispatch loop per event kind.
    /// Must be called inside a Tokio runtime.
    pub fn start(self) -> EventSender {
        EventSender {
            qr: spawn_dispatch("qr", self.qr),
            ready: spawn_dispatch("ready", self.ready),
            message: spawn_dispatch("message", self.message),
            disconnected: spawn_dispatch("disconnected", self.disconnected),
        }
    }
}

fn spawn_dispatch<T>(kind: &'static str, handlers: Vec<Handler<T>>) -> mpsc::Sender<T>
where
    T: Clone + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<T>(EVENT_QUEUE_DEPTH);
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            for (idx, handler) in handlers.iter().enumerate() {
                // A panicking handler must not take the dispatch loop down with it.
                if let Err(e) = tokio::spawn(handler(event.clone())).await {
                    if e.is_panic() {
                        let msg = guard::panic_message(e.into_panic().as_ref());
                        guard::report_transport_fault(kind, &msg);
                    } else {
                        tracing::warn!(target: "transport", kind, handler = idx, "event handler cancelled");
                    }
                }
            }
        }
        tracing::debug!(target: "transport", kind, "event stream closed");
    });
    tx
}

/// Cloneable handle used by transports to feed events into the bus.
#[derive(Clone)]
pub struct EventSender {
    qr: mpsc::Sender<String>,
    ready: mpsc::Sender<()>,
    message: mpsc::Sender<InboundMessage>,
    disconnected: mpsc::Sender<String>,
}

impl EventSender {
    pub async fn emit(&self, event: TransportEvent) -> Result<(), TransportError> {
        let sent = match event {
            TransportEvent::Qr(code) => self.qr.send(code).await.is_ok(),
            TransportEvent::Ready => self.ready.send(()).await.is_ok(),
            TransportEvent::Message(msg) => self.message.send(msg).await.is_ok(),
            TransportEvent::Disconnected(reason) => {
                self.disconnected.send(reason).await.is_ok()
            }
        };
        if sent {
            Ok(())
        } else {
            Err(TransportError::Closed)
        }
    }
}
