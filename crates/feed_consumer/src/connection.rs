use crate::config::FeedConnectionConfig;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::{FeedError, FeedResult};
use crate::flow::FlowKind;
use crate::middleware::{FeedConsumeLoggingLayer, FeedConsumeTracingLayer};
use crate::service::{DispatchService, FeedDelivery};
use anyhow::anyhow;
use async_trait::async_trait;
use common::{BrokerConnector, BrokerDelivery, BrokerSession, DeliveryStream};
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceBuilder, ServiceExt};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Lifecycle of a feed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Created,
    Connected,
    Consuming,
    Recovering,
    Stopped,
}

impl FeedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedState::Created => "created",
            FeedState::Connected => "connected",
            FeedState::Consuming => "consuming",
            FeedState::Recovering => "recovering",
            FeedState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for FeedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asks the platform to start pushing messages for a package.
///
/// Called by [`FeedConnection::start`] when `connect_at_start` is set.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DistributionActivator: Send + Sync {
    async fn ensure_started(&self, flow: FlowKind, package_id: i32) -> anyhow::Result<()>;
}

struct ConsumeTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the broker session for one flow and drives the consume loop.
pub struct FeedConnection {
    config: Arc<FeedConnectionConfig>,
    connector: Arc<dyn BrokerConnector>,
    dispatcher: Arc<Dispatcher>,
    activator: Option<Arc<dyn DistributionActivator>>,
    state: Arc<watch::Sender<FeedState>>,
    task: Option<ConsumeTask>,
}

impl FeedConnection {
    pub fn new(
        config: FeedConnectionConfig,
        connector: Arc<dyn BrokerConnector>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        let (state, _) = watch::channel(FeedState::Created);
        Self {
            config: Arc::new(config),
            connector,
            dispatcher,
            activator: None,
            state: Arc::new(state),
            task: None,
        }
    }

    pub fn with_distribution_activator(mut self, activator: Arc<dyn DistributionActivator>) -> Self {
        self.activator = Some(activator);
        self
    }

    pub fn config(&self) -> &FeedConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> FeedState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    /// Connect, subscribe to the package queue and spawn the consume loop.
    ///
    /// Only valid from `Created`. On failure the feed stays `Created` and
    /// `start` may be called again.
    pub async fn start(&mut self, connect_at_start: bool) -> FeedResult<()> {
        let current = self.state();
        if current != FeedState::Created {
            return Err(FeedError::InvalidState(current.to_string()));
        }
        self.config.validate()?;

        let flow = self.config.flow;
        let queue = self.config.queue_name();

        if connect_at_start {
            match &self.activator {
                Some(activator) => activator
                    .ensure_started(flow, self.config.package_id)
                    .await
                    .map_err(FeedError::Distribution)?,
                None => warn!(
                    flow = %flow,
                    package_id = self.config.package_id,
                    "connect at start requested but no distribution activator is configured"
                ),
            }
        }

        info!(
            flow = %flow,
            host = %self.config.host,
            virtual_host = %self.config.virtual_host(),
            queue = %queue,
            "Starting feed"
        );

        let (session, stream) = open_subscription(self.connector.as_ref(), &self.config)
            .await
            .map_err(FeedError::Connection)?;
        set_state(&self.state, flow, FeedState::Connected);

        let service = ServiceBuilder::new()
            .layer(FeedConsumeTracingLayer::new())
            .layer(FeedConsumeLoggingLayer::new())
            .service(DispatchService::new(self.dispatcher.clone()));

        let cancel = CancellationToken::new();
        let consume_loop = ConsumeLoop {
            config: self.config.clone(),
            connector: self.connector.clone(),
            state: self.state.clone(),
            service,
            cancel: cancel.clone(),
        };

        set_state(&self.state, flow, FeedState::Consuming);
        let span = info_span!("feed", flow = %flow, queue = %queue);
        let handle = tokio::spawn(consume_loop.run(session, stream).instrument(span));
        self.task = Some(ConsumeTask { cancel, handle });

        info!(flow = %flow, queue = %queue, "Feed consuming");
        Ok(())
    }

    /// Stop consuming and close the connection.
    ///
    /// The delivery being dispatched, if any, finishes first. Calling this
    /// on a feed that is not running does nothing. To stop on an external
    /// cancellation signal, drive the feed with [`FeedConnection::run`].
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            debug!(flow = %self.config.flow, state = %self.state(), "feed not running, nothing to stop");
            return;
        };

        info!(flow = %self.config.flow, "Stopping feed");
        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            error!(flow = %self.config.flow, error = %e, "consume loop task failed");
        }
        set_state(&self.state, self.config.flow, FeedState::Stopped);
        info!(flow = %self.config.flow, "Feed stopped");
    }

    /// Start, then run until `ctx` is cancelled or the feed stops on its own.
    pub async fn run(mut self, connect_at_start: bool, ctx: CancellationToken) -> anyhow::Result<()> {
        self.start(connect_at_start).await?;

        let mut state = self.watch_state();
        let stopped = async move { state.wait_for(|s| *s == FeedState::Stopped).await.is_ok() };
        let lost = tokio::select! {
            _ = ctx.cancelled() => false,
            lost = stopped => lost,
        };

        self.stop().await;

        if lost {
            return Err(anyhow!(
                "{} feed stopped after losing its broker connection",
                self.config.flow
            ));
        }
        Ok(())
    }
}

impl Drop for FeedConnection {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.cancel.cancel();
        }
    }
}

fn set_state(state: &watch::Sender<FeedState>, flow: FlowKind, next: FeedState) {
    let previous = state.send_replace(next);
    if previous != next {
        debug!(flow = %flow, from = %previous, to = %next, "feed state changed");
    }
}

async fn open_subscription(
    connector: &dyn BrokerConnector,
    config: &FeedConnectionConfig,
) -> anyhow::Result<(Box<dyn BrokerSession>, DeliveryStream)> {
    let session = connector.connect(&config.connection_settings()).await?;

    match session
        .consume(&config.queue_name(), &config.consumer_tag, config.prefetch_count)
        .await
    {
        Ok(stream) => Ok((session, stream)),
        Err(e) => {
            if let Err(close_err) = session.close().await {
                debug!(error = %close_err, "failed to close session after consume error");
            }
            Err(e)
        }
    }
}

struct ConsumeLoop<S> {
    config: Arc<FeedConnectionConfig>,
    connector: Arc<dyn BrokerConnector>,
    state: Arc<watch::Sender<FeedState>>,
    service: S,
    cancel: CancellationToken,
}

impl<S> ConsumeLoop<S>
where
    S: Service<FeedDelivery, Response = DispatchOutcome, Error = anyhow::Error> + Send + 'static,
    S::Future: Send,
{
    async fn run(mut self, mut session: Box<dyn BrokerSession>, mut stream: DeliveryStream) {
        let flow = self.config.flow;
        let queue = self.config.queue_name();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                item = stream.next() => Some(item),
            };

            match next {
                None => {
                    self.shutdown(session.as_ref()).await;
                    return;
                }
                Some(Some(Ok(delivery))) => self.process(&queue, delivery).await,
                Some(Some(Err(e))) => {
                    warn!(flow = %flow, error = %e, "Broker delivery stream failed");
                    match self.replace_lost_session(session).await {
                        Some((next_session, next_stream)) => {
                            session = next_session;
                            stream = next_stream;
                        }
                        None => return,
                    }
                }
                Some(None) => {
                    warn!(flow = %flow, "Broker delivery stream ended");
                    match self.replace_lost_session(session).await {
                        Some((next_session, next_stream)) => {
                            session = next_session;
                            stream = next_stream;
                        }
                        None => return,
                    }
                }
            }
        }
    }

    async fn process(&mut self, queue: &str, delivery: BrokerDelivery) {
        let request = FeedDelivery::new(self.config.flow, queue, delivery);

        let service = match self.service.ready().await {
            Ok(service) => service,
            Err(e) => {
                error!(error = %e, "consume service not ready, delivery dropped");
                return;
            }
        };

        if let Err(e) = service.call(request).await {
            error!(queue = %queue, error = %e, "service error processing delivery");
        }
    }

    /// Close a dead session and, when recovery is on, open a new one
    async fn replace_lost_session(
        &self,
        session: Box<dyn BrokerSession>,
    ) -> Option<(Box<dyn BrokerSession>, DeliveryStream)> {
        if let Err(e) = session.close().await {
            debug!(error = %e, "failed to close lost session");
        }
        drop(session);

        if !self.config.automatic_recovery {
            warn!(flow = %self.config.flow, "Automatic recovery disabled, feed stopping");
            set_state(&self.state, self.config.flow, FeedState::Stopped);
            return None;
        }

        self.recover().await
    }

    async fn recover(&self) -> Option<(Box<dyn BrokerSession>, DeliveryStream)> {
        let flow = self.config.flow;
        set_state(&self.state, flow, FeedState::Recovering);

        let mut attempt: u32 = 0;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(self.config.recovery_interval) => {}
            }

            attempt += 1;
            info!(flow = %flow, attempt, "Reconnecting to broker");

            let opened = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                opened = open_subscription(self.connector.as_ref(), &self.config) => opened,
            };

            match opened {
                Ok(subscription) => {
                    set_state(&self.state, flow, FeedState::Connected);
                    set_state(&self.state, flow, FeedState::Consuming);
                    info!(flow = %flow, attempt, "Feed recovered");
                    return Some(subscription);
                }
                Err(e) => {
                    warn!(
                        flow = %flow,
                        attempt,
                        error = %e,
                        retry_in_ms = self.config.recovery_interval.as_millis() as u64,
                        "Reconnect failed"
                    );
                }
            }
        }
    }

    async fn shutdown(&self, session: &dyn BrokerSession) {
        debug!(flow = %self.config.flow, "shutdown signal received, closing subscription");
        if let Err(e) = session.cancel(&self.config.consumer_tag).await {
            warn!(error = %e, "failed to cancel consumer");
        }
        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close broker connection");
        }
    }
}
