//! Shared fixtures for the unit tests in this crate.

use crate::codec::{MessageHeader, TransportMetadata};
use crate::handlers::EntityHandler;
use anyhow::anyhow;
use async_trait::async_trait;
use common::{BrokerConnector, BrokerDelivery, BrokerSession, ConnectionSettings, DeliveryStream};
use feed_entities::FeedEntity;
use futures::channel::mpsc;
use futures::StreamExt;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Poll `condition` until it holds, failing the test after two seconds
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall<T> {
    pub header: MessageHeader,
    pub transport: Option<TransportMetadata>,
    pub entity: T,
}

/// Handler that keeps every call it receives
pub struct RecordingHandler<T> {
    calls: Mutex<Vec<RecordedCall<T>>>,
}

impl<T: FeedEntity + Clone> RecordingHandler<T> {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall<T>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl<T: FeedEntity + Clone> EntityHandler<T> for RecordingHandler<T> {
    async fn process(
        &self,
        header: &MessageHeader,
        transport: Option<&TransportMetadata>,
        entity: T,
    ) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(RecordedCall {
            header: header.clone(),
            transport: transport.cloned(),
            entity,
        });
        Ok(())
    }
}

/// Handler that always returns an error
pub struct FailingHandler;

#[async_trait]
impl<T: FeedEntity> EntityHandler<T> for FailingHandler {
    async fn process(
        &self,
        _header: &MessageHeader,
        _transport: Option<&TransportMetadata>,
        _entity: T,
    ) -> anyhow::Result<()> {
        Err(anyhow!("handler exploded"))
    }
}

/// Handler that panics
pub struct PanickingHandler;

#[async_trait]
impl<T: FeedEntity> EntityHandler<T> for PanickingHandler {
    async fn process(
        &self,
        _header: &MessageHeader,
        _transport: Option<&TransportMetadata>,
        _entity: T,
    ) -> anyhow::Result<()> {
        panic!("handler panicked on purpose");
    }
}

/// Handler that sleeps before returning
pub struct SlowHandler(pub Duration);

#[async_trait]
impl<T: FeedEntity> EntityHandler<T> for SlowHandler {
    async fn process(
        &self,
        _header: &MessageHeader,
        _transport: Option<&TransportMetadata>,
        _entity: T,
    ) -> anyhow::Result<()> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Layer that records every event emitted while it is the default subscriber
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// Install as the thread default; logs are captured until the guard drops
    pub fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::registry().with(logs.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn at(&self, level: Level) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .collect()
    }

    /// Events at `level` whose message contains `text`
    pub fn matching(&self, level: Level, text: &str) -> Vec<CapturedEvent> {
        self.at(level)
            .into_iter()
            .filter(|event| event.message.contains(text))
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }
}

type DeliverySender = mpsc::UnboundedSender<anyhow::Result<BrokerDelivery>>;
type DeliveryReceiver = mpsc::UnboundedReceiver<anyhow::Result<BrokerDelivery>>;

#[derive(Default)]
struct FakeBrokerState {
    // `None` entries make the matching connect attempt fail
    sessions: Mutex<VecDeque<Option<DeliveryReceiver>>>,
    settings: Mutex<Vec<ConnectionSettings>>,
    subscriptions: Mutex<Vec<(String, String, u16)>>,
    connects: AtomicUsize,
    cancels: AtomicUsize,
    closes: AtomicUsize,
}

/// In-memory broker; each successful connect hands out one prepared stream
#[derive(Clone, Default)]
pub struct FakeBroker {
    state: Arc<FakeBrokerState>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> Arc<dyn BrokerConnector> {
        Arc::new(self.clone())
    }

    /// Queue a session for the next connect; the sender feeds its stream
    pub fn prepare_session(&self) -> DeliverySender {
        let (tx, rx) = mpsc::unbounded();
        self.state.sessions.lock().unwrap().push_back(Some(rx));
        tx
    }

    /// Make the next connect attempt fail
    pub fn refuse_next_connect(&self) {
        self.state.sessions.lock().unwrap().push_back(None);
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.state.cancels.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> Vec<ConnectionSettings> {
        self.state.settings.lock().unwrap().clone()
    }

    /// (queue, consumer tag, prefetch) per consume call
    pub fn subscriptions(&self) -> Vec<(String, String, u16)> {
        self.state.subscriptions.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerConnector for FakeBroker {
    async fn connect(&self, settings: &ConnectionSettings) -> anyhow::Result<Box<dyn BrokerSession>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state.settings.lock().unwrap().push(settings.clone());

        match self.state.sessions.lock().unwrap().pop_front() {
            Some(Some(rx)) => Ok(Box::new(FakeSession {
                deliveries: Mutex::new(Some(rx)),
                state: self.state.clone(),
            })),
            _ => Err(anyhow!("connection refused")),
        }
    }
}

struct FakeSession {
    deliveries: Mutex<Option<DeliveryReceiver>>,
    state: Arc<FakeBrokerState>,
}

#[async_trait]
impl BrokerSession for FakeSession {
    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        prefetch_count: u16,
    ) -> anyhow::Result<DeliveryStream> {
        self.state.subscriptions.lock().unwrap().push((
            queue.to_string(),
            consumer_tag.to_string(),
            prefetch_count,
        ));
        let rx = self
            .deliveries
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow!("already consuming"))?;
        Ok(rx.boxed())
    }

    async fn cancel(&self, _consumer_tag: &str) -> anyhow::Result<()> {
        self.state.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Raw envelope bytes for a type key and JSON body text
pub fn envelope_json(entity_key: i32, body: &str) -> String {
    format!(r#"{{"Header":{{"Type":{}}},"Body":{}}}"#, entity_key, body)
}
